//! PostgreSQL store (runtime-checked queries)

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::models::{
    CareerEvent, Complaint, ComplaintStatus, Employee, EmployeeCreate, EmployeeUpdate, GradeRate,
    GradeRateCreate, GradeRateUpdate, Role, SalaryRecord, User, UserQuery, UserSort,
};
use shared::util::now_millis;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    ComplaintEdit, NewComplaint, NewSalaryRecord, NewUser, PayrollStore, StatusChange,
    StoreError, StoreResult, UserChanges,
};

const USER_COLUMNS: &str = "id, matricule, password_hash, role, first_name, last_name, \
                            phone, email, is_active, created_at";
const EMPLOYEE_COLUMNS: &str = "id, matricule, first_name, last_name, grade, grade_index, \
                                service, department, entry_date, phone, email, is_active, created_at";
const GRADE_RATE_COLUMNS: &str = "id, grade, cnss_rate, ipts_rate, updated_at";
const SALARY_COLUMNS: &str = "id, employee_id, period, start_date, end_date, duration_days, \
                              base_salary, allowance, cnss_amount, ipts_amount, net_salary, \
                              recall_amount, liquidated_amount, payment_status, observations, \
                              created_at, created_by, version";
const COMPLAINT_COLUMNS: &str = "id, employee_id, type, description, period_start, period_end, \
                                 attachments, status, resolved_at, resolved_by, created_at";
const CAREER_COLUMNS: &str = "id, employee_id, grade, service, start_date, end_date, is_current, \
                              created_at";

/// Lower-cased needle matched with `strpos`, so `%`/`_` need no escaping
const NAME_SEARCH: &str = "(strpos(LOWER(matricule), $1) > 0 \
                           OR strpos(LOWER(first_name), $1) > 0 \
                           OR strpos(LOWER(last_name), $1) > 0)";

fn user_sort_column(sort: UserSort) -> &'static str {
    match sort {
        UserSort::LastName => "LOWER(last_name)",
        UserSort::FirstName => "LOWER(first_name)",
        UserSort::Matricule => "matricule",
        UserSort::Role => "role",
        UserSort::CreatedAt => "created_at",
    }
}

async fn open_career_event(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: i64,
    grade: &str,
    service: &str,
    start: NaiveDate,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO career_history (employee_id, grade, service, start_date, is_current, created_at) \
         VALUES ($1, $2, $3, $4, TRUE, $5)",
    )
    .bind(employee_id)
    .bind(grade)
    .bind(service)
    .bind(start)
    .bind(now_millis())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and apply embedded migrations
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// After a conditional write matched nothing: `NotFound` if the row is
    /// gone, `Conflict` if it is in another state
    async fn miss(&self, table: &'static str, what: &str, id: i64) -> StoreError {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
        match sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(true) => StoreError::Conflict(format!("{what} {id} changed concurrently")),
            Ok(false) => StoreError::NotFound(format!("{what} {id}")),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl PayrollStore for PgStore {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_matricule(&self, matricule: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE matricule = $1");
        Ok(sqlx::query_as(&sql)
            .bind(matricule)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (matricule, password_hash, role, first_name, last_name,
                               phone, email, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, $8)
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as(&sql)
            .bind(&user.matricule)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.phone)
            .bind(&user.email)
            .bind(now_millis())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<(Vec<User>, u64)> {
        let needle = query.search.to_lowercase();
        let filter = format!("($2 OR {NAME_SEARCH})");
        let count_sql = format!("SELECT COUNT(*) FROM users WHERE {filter}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&needle)
            .bind(needle.is_empty())
            .fetch_one(&self.pool)
            .await?;

        let direction = if query.sort_desc { "DESC" } else { "ASC" };
        let page_sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {filter} \
             ORDER BY {} {direction}, id {direction} LIMIT $3 OFFSET $4",
            user_sort_column(query.sort_by)
        );
        let users = sqlx::query_as(&page_sql)
            .bind(&needle)
            .bind(needle.is_empty())
            .bind(i64::from(query.limit))
            .bind(i64::try_from(query.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        Ok((users, u64::try_from(total).unwrap_or_default()))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User> {
        let sql = format!(
            r#"
            UPDATE users SET
                role = COALESCE($2, role),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                phone = COALESCE($5, phone),
                email = COALESCE($6, email),
                is_active = COALESCE($7, is_active),
                password_hash = COALESCE($8, password_hash)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as(&sql)
            .bind(id)
            .bind(changes.role)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.phone)
            .bind(&changes.email)
            .bind(changes.is_active)
            .bind(&changes.password_hash)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn admin_user_ids(&self) -> StoreResult<Vec<i64>> {
        let ids: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE role = $1 AND is_active ORDER BY id")
                .bind(Role::Admin)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    async fn get_employee(&self, id: i64) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_employee_by_matricule(&self, matricule: &str) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE matricule = $1");
        Ok(sqlx::query_as(&sql)
            .bind(matricule)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_employee(&self, employee: EmployeeCreate) -> StoreResult<Employee> {
        let sql = format!(
            r#"
            INSERT INTO employees (matricule, first_name, last_name, grade, grade_index,
                                   service, department, entry_date, phone, email,
                                   is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, $11)
            RETURNING {EMPLOYEE_COLUMNS}
            "#
        );
        let mut tx = self.pool.begin().await?;
        let row: Employee = sqlx::query_as(&sql)
            .bind(&employee.matricule)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.grade)
            .bind(employee.grade_index)
            .bind(&employee.service)
            .bind(&employee.department)
            .bind(employee.entry_date)
            .bind(&employee.phone)
            .bind(&employee.email)
            .bind(now_millis())
            .fetch_one(&mut *tx)
            .await?;
        open_career_event(&mut tx, row.id, &row.grade, &row.service, row.entry_date).await?;
        tx.commit().await?;
        Ok(row)
    }

    async fn update_employee(
        &self,
        id: i64,
        update: EmployeeUpdate,
        effective: NaiveDate,
    ) -> StoreResult<Employee> {
        let mut tx = self.pool.begin().await?;
        let select = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1 FOR UPDATE");
        let current: Employee = sqlx::query_as(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("employee {id}")))?;
        let moved = update.changes_position(&current);

        let sql = format!(
            r#"
            UPDATE employees SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                grade = COALESCE($4, grade),
                grade_index = COALESCE($5, grade_index),
                service = COALESCE($6, service),
                department = COALESCE($7, department),
                entry_date = COALESCE($8, entry_date),
                phone = COALESCE($9, phone),
                email = COALESCE($10, email),
                is_active = COALESCE($11, is_active)
            WHERE id = $1
            RETURNING {EMPLOYEE_COLUMNS}
            "#
        );
        let updated: Employee = sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.grade)
            .bind(update.grade_index)
            .bind(&update.service)
            .bind(&update.department)
            .bind(update.entry_date)
            .bind(&update.phone)
            .bind(&update.email)
            .bind(update.is_active)
            .fetch_one(&mut *tx)
            .await?;

        if moved {
            sqlx::query(
                "UPDATE career_history SET is_current = FALSE, end_date = $2 \
                 WHERE employee_id = $1 AND is_current",
            )
            .bind(id)
            .bind(effective)
            .execute(&mut *tx)
            .await?;
            open_career_event(&mut tx, id, &updated.grade, &updated.service, effective).await?;
        }
        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_employee(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("employee {id}")));
        }
        Ok(())
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id");
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    async fn employee_departments(&self) -> StoreResult<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT DISTINCT department FROM employees ORDER BY department")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn search_employees(&self, query: &str) -> StoreResult<Vec<Employee>> {
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE {NAME_SEARCH} ORDER BY last_name, id"
        );
        Ok(sqlx::query_as(&sql)
            .bind(query.to_lowercase())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn career_history(&self, employee_id: i64) -> StoreResult<Vec<CareerEvent>> {
        let sql = format!(
            "SELECT {CAREER_COLUMNS} FROM career_history WHERE employee_id = $1 \
             ORDER BY start_date DESC, id DESC"
        );
        Ok(sqlx::query_as(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_grade_rates(&self) -> StoreResult<Vec<GradeRate>> {
        let sql = format!("SELECT {GRADE_RATE_COLUMNS} FROM grade_rates ORDER BY grade");
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_grade_rate(&self, grade: &str) -> StoreResult<Option<GradeRate>> {
        let sql = format!("SELECT {GRADE_RATE_COLUMNS} FROM grade_rates WHERE grade = $1");
        Ok(sqlx::query_as(&sql)
            .bind(grade)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_grade_rate(&self, rate: GradeRateCreate) -> StoreResult<GradeRate> {
        let sql = format!(
            r#"
            INSERT INTO grade_rates (grade, cnss_rate, ipts_rate, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {GRADE_RATE_COLUMNS}
            "#
        );
        Ok(sqlx::query_as(&sql)
            .bind(&rate.grade)
            .bind(rate.cnss_rate)
            .bind(rate.ipts_rate)
            .bind(now_millis())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_grade_rate(&self, id: i64, update: GradeRateUpdate) -> StoreResult<GradeRate> {
        let sql = format!(
            r#"
            UPDATE grade_rates SET
                grade = COALESCE($2, grade),
                cnss_rate = COALESCE($3, cnss_rate),
                ipts_rate = COALESCE($4, ipts_rate),
                updated_at = $5
            WHERE id = $1
            RETURNING {GRADE_RATE_COLUMNS}
            "#
        );
        sqlx::query_as(&sql)
            .bind(id)
            .bind(&update.grade)
            .bind(update.cnss_rate)
            .bind(update.ipts_rate)
            .bind(now_millis())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("grade rate {id}")))
    }

    async fn delete_grade_rate(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM grade_rates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("grade rate {id}")));
        }
        Ok(())
    }

    async fn create_salary_record(&self, record: NewSalaryRecord) -> StoreResult<SalaryRecord> {
        let sql = format!(
            r#"
            INSERT INTO salary_records (
                employee_id, period, start_date, end_date, duration_days,
                base_salary, allowance, cnss_amount, ipts_amount, net_salary,
                recall_amount, liquidated_amount, payment_status, observations,
                created_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {SALARY_COLUMNS}
            "#
        );
        Ok(sqlx::query_as(&sql)
            .bind(record.employee_id)
            .bind(&record.period)
            .bind(record.start_date)
            .bind(record.end_date)
            .bind(record.duration_days)
            .bind(record.base_salary)
            .bind(record.allowance)
            .bind(record.cnss_amount)
            .bind(record.ipts_amount)
            .bind(record.net_salary)
            .bind(record.recall_amount)
            .bind(record.liquidated_amount)
            .bind(record.payment_status)
            .bind(&record.observations)
            .bind(now_millis())
            .bind(record.created_by)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_salary_record(&self, id: i64) -> StoreResult<Option<SalaryRecord>> {
        let sql = format!("SELECT {SALARY_COLUMNS} FROM salary_records WHERE id = $1");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_salary_record(&self, record: SalaryRecord) -> StoreResult<SalaryRecord> {
        let sql = format!(
            r#"
            UPDATE salary_records SET
                period = $2, start_date = $3, end_date = $4, duration_days = $5,
                base_salary = $6, allowance = $7, cnss_amount = $8, ipts_amount = $9,
                net_salary = $10, recall_amount = $11, liquidated_amount = $12,
                payment_status = $13, observations = $14, version = version + 1
            WHERE id = $1 AND version = $15
            RETURNING {SALARY_COLUMNS}
            "#
        );
        let updated = sqlx::query_as(&sql)
            .bind(record.id)
            .bind(&record.period)
            .bind(record.start_date)
            .bind(record.end_date)
            .bind(record.duration_days)
            .bind(record.base_salary)
            .bind(record.allowance)
            .bind(record.cnss_amount)
            .bind(record.ipts_amount)
            .bind(record.net_salary)
            .bind(record.recall_amount)
            .bind(record.liquidated_amount)
            .bind(record.payment_status)
            .bind(&record.observations)
            .bind(record.version)
            .fetch_optional(&self.pool)
            .await?;
        match updated {
            Some(row) => Ok(row),
            None => Err(self.miss("salary_records", "salary record", record.id).await),
        }
    }

    async fn list_salary_records(&self) -> StoreResult<Vec<SalaryRecord>> {
        let sql = format!("SELECT {SALARY_COLUMNS} FROM salary_records ORDER BY start_date, id");
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_salary_records_for_employee(
        &self,
        employee_id: i64,
    ) -> StoreResult<Vec<SalaryRecord>> {
        let sql = format!(
            "SELECT {SALARY_COLUMNS} FROM salary_records WHERE employee_id = $1 \
             ORDER BY start_date, id"
        );
        Ok(sqlx::query_as(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<Complaint> {
        let sql = format!(
            r#"
            INSERT INTO complaints (employee_id, type, description, period_start, period_end,
                                    attachments, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COMPLAINT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as(&sql)
            .bind(complaint.employee_id)
            .bind(&complaint.complaint_type)
            .bind(&complaint.description)
            .bind(complaint.period_start)
            .bind(complaint.period_end)
            .bind(Json(&complaint.attachments))
            .bind(ComplaintStatus::Pending)
            .bind(now_millis())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_complaint(&self, id: i64) -> StoreResult<Option<Complaint>> {
        let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1");
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_complaint(&self, id: i64, edit: ComplaintEdit) -> StoreResult<Complaint> {
        let sql = format!(
            r#"
            UPDATE complaints SET
                type = $2, description = $3, period_start = $4, period_end = $5,
                attachments = $6
            WHERE id = $1 AND status <> $7
            RETURNING {COMPLAINT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as(&sql)
            .bind(id)
            .bind(&edit.complaint_type)
            .bind(&edit.description)
            .bind(edit.period_start)
            .bind(edit.period_end)
            .bind(Json(&edit.attachments))
            .bind(ComplaintStatus::Resolved)
            .fetch_optional(&self.pool)
            .await?;
        match updated {
            Some(row) => Ok(row),
            None => Err(self.miss("complaints", "complaint", id).await),
        }
    }

    async fn set_complaint_status(
        &self,
        id: i64,
        change: StatusChange,
    ) -> StoreResult<Complaint> {
        let sql = format!(
            r#"
            UPDATE complaints SET status = $3, resolved_at = $4, resolved_by = $5
            WHERE id = $1 AND status = $2
            RETURNING {COMPLAINT_COLUMNS}
            "#
        );
        let updated = sqlx::query_as(&sql)
            .bind(id)
            .bind(change.from)
            .bind(change.to)
            .bind(change.resolved_at)
            .bind(change.resolved_by)
            .fetch_optional(&self.pool)
            .await?;
        match updated {
            Some(row) => Ok(row),
            None => Err(self.miss("complaints", "complaint", id).await),
        }
    }

    async fn delete_complaint(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM complaints WHERE id = $1 AND status <> $2")
            .bind(id)
            .bind(ComplaintStatus::Resolved)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(self.miss("complaints", "complaint", id).await);
        }
        Ok(())
    }

    async fn list_complaints(&self, status: Option<ComplaintStatus>) -> StoreResult<Vec<Complaint>> {
        let sql = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints \
             WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_complaints_for_employee(&self, employee_id: i64) -> StoreResult<Vec<Complaint>> {
        let sql = format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE employee_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?)
    }
}
