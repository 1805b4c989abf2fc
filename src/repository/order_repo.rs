// ==========================================
// 枪托生产流水排程系统 - 订单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 单订单变更为单一临界区(事务 + revision 乐观锁)
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::ProductionOrder;
use crate::domain::types::{Department, OrderStatus};
use crate::repository::error::{MutateError, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
// 唯一事实层: 所有订单读写经由此仓储
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

/// SELECT 列清单(与 map_order_row 对齐)
const ORDER_COLUMNS: &str = "order_id, fb_order_number, current_department, status, \
     entered_department_at, order_date, due_date, is_replacement, replaced_order_id, \
     scrap_reason, scrap_date, scrap_disposition, scrap_authorization, \
     priority_score, queue_position, model_id, features, revision, created_at, updated_at";

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn conversion_failure(field: &str, raw: &str) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("字段 {} 值非法: {}", field, raw).into(),
        )
    }

    /// 行 → ProductionOrder
    fn map_order_row(row: &Row<'_>) -> rusqlite::Result<ProductionOrder> {
        let dept_raw: String = row.get("current_department")?;
        let current_department = Department::parse(&dept_raw)
            .ok_or_else(|| Self::conversion_failure("current_department", &dept_raw))?;

        let status_raw: String = row.get("status")?;
        let status = OrderStatus::from_db_str(&status_raw)
            .ok_or_else(|| Self::conversion_failure("status", &status_raw))?;

        let features_raw: Option<String> = row.get("features")?;
        let features = match features_raw {
            Some(raw) => Some(
                serde_json::from_str(&raw)
                    .map_err(|_| Self::conversion_failure("features", &raw))?,
            ),
            None => None,
        };

        Ok(ProductionOrder {
            order_id: row.get("order_id")?,
            fb_order_number: row.get("fb_order_number")?,
            current_department,
            status,
            entered_department_at: row.get("entered_department_at")?,
            order_date: row.get("order_date")?,
            due_date: row.get("due_date")?,
            is_replacement: row.get("is_replacement")?,
            replaced_order_id: row.get("replaced_order_id")?,
            scrap_reason: row.get("scrap_reason")?,
            scrap_date: row.get("scrap_date")?,
            scrap_disposition: row.get("scrap_disposition")?,
            scrap_authorization: row.get("scrap_authorization")?,
            priority_score: row.get("priority_score")?,
            queue_position: row.get("queue_position")?,
            model_id: row.get("model_id")?,
            features,
            revision: row.get("revision")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 插入新订单
    ///
    /// 外部建单与补做单共用;order_id 重复返回 UniqueConstraintViolation
    pub fn insert(&self, order: &ProductionOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let features_raw = order.features.as_ref().map(|v| v.to_string());

        conn.execute(
            r#"
            INSERT INTO production_order (
                order_id, fb_order_number, current_department, status,
                entered_department_at, order_date, due_date, is_replacement, replaced_order_id,
                scrap_reason, scrap_date, scrap_disposition, scrap_authorization,
                priority_score, queue_position, model_id, features, revision, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20
            )
            "#,
            params![
                order.order_id,
                order.fb_order_number,
                order.current_department.as_str(),
                order.status.to_db_str(),
                order.entered_department_at,
                order.order_date,
                order.due_date,
                order.is_replacement,
                order.replaced_order_id,
                order.scrap_reason,
                order.scrap_date,
                order.scrap_disposition,
                order.scrap_authorization,
                order.priority_score,
                order.queue_position,
                order.model_id,
                features_raw,
                order.revision,
                order.created_at,
                order.updated_at,
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 读取
    // ==========================================

    /// 按 order_id 查询
    pub fn get(&self, order_id: &str) -> RepositoryResult<ProductionOrder> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_order WHERE order_id = ?1",
            ORDER_COLUMNS
        );

        conn.query_row(&sql, params![order_id], Self::map_order_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                    entity: "ProductionOrder".to_string(),
                    id: order_id.to_string(),
                },
                other => other.into(),
            })
    }

    /// 按部门列出订单(不过滤状态,已报废订单保留在末段供审计)
    ///
    /// 排序: created_at, order_id(稳定,供上层作并列基准)
    pub fn list_by_department(&self, dept: Department) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_order WHERE current_department = ?1 \
             ORDER BY created_at, order_id",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![dept.as_str()], Self::map_order_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// 列出全部在制订单
    pub fn list_active(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_order WHERE status = 'ACTIVE' \
             ORDER BY created_at, order_id",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_order_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// 列出入口队列(已编位,按位置升序)
    pub fn list_queue(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_order \
             WHERE current_department = ?1 AND status = 'ACTIVE' AND queue_position IS NOT NULL \
             ORDER BY queue_position",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![Department::entry().as_str()], Self::map_order_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// 列出入口段未编位订单(auto_populate 的候选集)
    ///
    /// 排序: created_at, order_id(到达顺序,作为同分并列的保持基准)
    pub fn list_unqueued_entry(&self) -> RepositoryResult<Vec<ProductionOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_order \
             WHERE current_department = ?1 AND status = 'ACTIVE' AND queue_position IS NULL \
             ORDER BY created_at, order_id",
            ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![Department::entry().as_str()], Self::map_order_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// 查找引用某原单的补做单
    pub fn find_replacement_of(&self, order_id: &str) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_order WHERE replaced_order_id = ?1 LIMIT 1",
            ORDER_COLUMNS
        );
        match conn.query_row(&sql, params![order_id], Self::map_order_row) {
            Ok(order) => Ok(Some(order)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ==========================================
    // 原子变更
    // ==========================================

    /// 闭包式单订单变更(读-改-写单一临界区)
    ///
    /// # 语义
    /// - 事务内读取订单并执行闭包;闭包返回 Err 时事务回滚,记录保持原状
    /// - 写回带 revision 守卫(WHERE revision = 读取值),失配返回乐观锁冲突
    /// - revision 与 updated_at 由仓储统一推进,闭包内的赋值会被覆盖
    ///
    /// # 参数
    /// - order_id: 目标订单
    /// - now: 写入时间(审计字段)
    /// - f: 变更闭包,返回 Err 表示业务规则拒绝
    pub fn mutate<E, F>(
        &self,
        order_id: &str,
        now: DateTime<Utc>,
        f: F,
    ) -> Result<ProductionOrder, MutateError<E>>
    where
        F: FnOnce(&mut ProductionOrder) -> Result<(), E>,
    {
        let conn = self.get_conn().map_err(MutateError::Store)?;
        let tx = conn.unchecked_transaction().map_err(|e| {
            MutateError::Store(RepositoryError::DatabaseTransactionError(e.to_string()))
        })?;

        let sql = format!(
            "SELECT {} FROM production_order WHERE order_id = ?1",
            ORDER_COLUMNS
        );
        let mut order = match tx.query_row(&sql, params![order_id], Self::map_order_row) {
            Ok(order) => order,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(MutateError::Store(RepositoryError::NotFound {
                    entity: "ProductionOrder".to_string(),
                    id: order_id.to_string(),
                }))
            }
            Err(e) => return Err(MutateError::Store(e.into())),
        };

        let expected = order.revision;

        // 业务规则拒绝: 事务随 tx 丢弃回滚
        f(&mut order).map_err(MutateError::Rejected)?;

        order.revision = expected + 1;
        order.updated_at = now;

        let features_raw = order.features.as_ref().map(|v| v.to_string());
        let affected = tx
            .execute(
                r#"
                UPDATE production_order SET
                    fb_order_number = ?1, current_department = ?2, status = ?3,
                    entered_department_at = ?4, order_date = ?5, due_date = ?6,
                    is_replacement = ?7, replaced_order_id = ?8,
                    scrap_reason = ?9, scrap_date = ?10, scrap_disposition = ?11,
                    scrap_authorization = ?12, priority_score = ?13, queue_position = ?14,
                    model_id = ?15, features = ?16, revision = ?17, updated_at = ?18
                WHERE order_id = ?19 AND revision = ?20
                "#,
                params![
                    order.fb_order_number,
                    order.current_department.as_str(),
                    order.status.to_db_str(),
                    order.entered_department_at,
                    order.order_date,
                    order.due_date,
                    order.is_replacement,
                    order.replaced_order_id,
                    order.scrap_reason,
                    order.scrap_date,
                    order.scrap_disposition,
                    order.scrap_authorization,
                    order.priority_score,
                    order.queue_position,
                    order.model_id,
                    features_raw,
                    order.revision,
                    order.updated_at,
                    order.order_id,
                    expected,
                ],
            )
            .map_err(|e| MutateError::Store(e.into()))?;

        if affected == 0 {
            return Err(MutateError::Store(RepositoryError::OptimisticLockFailure {
                order_id: order_id.to_string(),
                expected,
            }));
        }

        tx.commit().map_err(|e| {
            MutateError::Store(RepositoryError::DatabaseTransactionError(e.to_string()))
        })?;

        Ok(order)
    }

    /// 批量闭包变更
    ///
    /// 单订单原子,跨订单不原子: 每个 id 独立事务,逐项返回结果,
    /// 任一失败不回滚其他成功项
    pub fn mutate_many<E, F>(
        &self,
        order_ids: &[String],
        now: DateTime<Utc>,
        f: F,
    ) -> Vec<(String, Result<ProductionOrder, MutateError<E>>)>
    where
        F: Fn(&mut ProductionOrder) -> Result<(), E>,
    {
        order_ids
            .iter()
            .map(|order_id| (order_id.clone(), self.mutate(order_id, now, &f)))
            .collect()
    }

    /// 批量改写队列位置(单事务)
    ///
    /// 供重编号/交换/批量覆写使用;调用方负责业务校验,
    /// 此处仅保证整批写入一致落库
    pub fn apply_queue_positions(
        &self,
        pairs: &[(String, i32)],
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for (order_id, position) in pairs {
            let affected = tx.execute(
                "UPDATE production_order \
                 SET queue_position = ?1, revision = revision + 1, updated_at = ?2 \
                 WHERE order_id = ?3",
                params![position, now, order_id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "ProductionOrder".to_string(),
                    id: order_id.clone(),
                });
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}
