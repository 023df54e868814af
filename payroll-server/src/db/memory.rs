//! In-memory store for development and tests

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use shared::models::{
    CareerEvent, Complaint, ComplaintStatus, Employee, EmployeeCreate, EmployeeUpdate, GradeRate,
    GradeRateCreate, GradeRateUpdate, Role, SalaryRecord, User, UserQuery, UserSort,
};
use shared::util::now_millis;

use super::{
    ComplaintEdit, NewComplaint, NewSalaryRecord, NewUser, PayrollStore, StatusChange,
    StoreError, StoreResult, UserChanges,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    employees: BTreeMap<i64, Employee>,
    grade_rates: BTreeMap<i64, GradeRate>,
    salary_records: BTreeMap<i64, SalaryRecord>,
    complaints: BTreeMap<i64, Complaint>,
    career: BTreeMap<i64, CareerEvent>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn open_career_event(&mut self, employee_id: i64, grade: &str, service: &str, start: NaiveDate) {
        let id = self.next_id();
        self.career.insert(
            id,
            CareerEvent {
                id,
                employee_id,
                grade: grade.to_string(),
                service: service.to_string(),
                start_date: start,
                end_date: None,
                is_current: true,
                created_at: now_millis(),
            },
        );
    }

    fn complaint_mut(&mut self, id: i64) -> StoreResult<&mut Complaint> {
        self.complaints
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("complaint {id}")))
    }
}

fn user_order(sort: UserSort, a: &User, b: &User) -> Ordering {
    let primary = match sort {
        UserSort::LastName => a.last_name.to_lowercase().cmp(&b.last_name.to_lowercase()),
        UserSort::FirstName => a.first_name.to_lowercase().cmp(&b.first_name.to_lowercase()),
        UserSort::Matricule => a.matricule.cmp(&b.matricule),
        UserSort::Role => a.role.as_str().cmp(b.role.as_str()),
        UserSort::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    primary.then(a.id.cmp(&b.id))
}

fn matches_search(needle: &str, fields: [&str; 3]) -> bool {
    fields.iter().any(|f| f.to_lowercase().contains(needle))
}

/// Process-local store; ids are allocated from one counter shared by all tables
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn find_user_by_matricule(&self, matricule: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .values()
            .find(|u| u.matricule == matricule)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write();
        if tables.users.values().any(|u| u.matricule == user.matricule) {
            return Err(StoreError::Duplicate(format!("user {}", user.matricule)));
        }
        let id = tables.next_id();
        let row = User {
            id,
            matricule: user.matricule,
            password_hash: user.password_hash,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            email: user.email,
            is_active: true,
            created_at: now_millis(),
        };
        tables.users.insert(id, row.clone());
        Ok(row)
    }

    async fn list_users(&self, query: &UserQuery) -> StoreResult<(Vec<User>, u64)> {
        let tables = self.tables.read();
        let needle = query.search.to_lowercase();
        let mut users: Vec<&User> = tables
            .users
            .values()
            .filter(|u| {
                needle.is_empty()
                    || matches_search(&needle, [u.matricule.as_str(), u.first_name.as_str(), u.last_name.as_str()])
            })
            .collect();
        users.sort_by(|a, b| user_order(query.sort_by, a, b));
        if query.sort_desc {
            users.reverse();
        }
        let total = users.len() as u64;
        let page = users
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User> {
        let mut tables = self.tables.write();
        let row = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        if let Some(role) = changes.role {
            row.role = role;
        }
        if let Some(first_name) = changes.first_name {
            row.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            row.last_name = last_name;
        }
        if changes.phone.is_some() {
            row.phone = changes.phone;
        }
        if changes.email.is_some() {
            row.email = changes.email;
        }
        if let Some(active) = changes.is_active {
            row.is_active = active;
        }
        if let Some(hash) = changes.password_hash {
            row.password_hash = hash;
        }
        Ok(row.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&id) {
            return Err(StoreError::NotFound(format!("user {id}")));
        }
        let referenced = tables
            .salary_records
            .values()
            .any(|r| r.created_by == Some(id))
            || tables.complaints.values().any(|c| c.resolved_by == Some(id));
        if referenced {
            return Err(StoreError::Referenced(format!("user {id}")));
        }
        tables.users.remove(&id);
        Ok(())
    }

    async fn admin_user_ids(&self) -> StoreResult<Vec<i64>> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == Role::Admin && u.is_active)
            .map(|u| u.id)
            .collect())
    }

    async fn get_employee(&self, id: i64) -> StoreResult<Option<Employee>> {
        Ok(self.tables.read().employees.get(&id).cloned())
    }

    async fn find_employee_by_matricule(&self, matricule: &str) -> StoreResult<Option<Employee>> {
        let tables = self.tables.read();
        Ok(tables
            .employees
            .values()
            .find(|e| e.matricule == matricule)
            .cloned())
    }

    async fn create_employee(&self, employee: EmployeeCreate) -> StoreResult<Employee> {
        let mut tables = self.tables.write();
        if tables
            .employees
            .values()
            .any(|e| e.matricule == employee.matricule)
        {
            return Err(StoreError::Duplicate(format!(
                "employee {}",
                employee.matricule
            )));
        }
        let id = tables.next_id();
        let row = Employee {
            id,
            matricule: employee.matricule,
            first_name: employee.first_name,
            last_name: employee.last_name,
            grade: employee.grade,
            grade_index: employee.grade_index,
            service: employee.service,
            department: employee.department,
            entry_date: employee.entry_date,
            phone: employee.phone,
            email: employee.email,
            is_active: true,
            created_at: now_millis(),
        };
        tables.employees.insert(id, row.clone());
        tables.open_career_event(id, &row.grade, &row.service, row.entry_date);
        Ok(row)
    }

    async fn update_employee(
        &self,
        id: i64,
        update: EmployeeUpdate,
        effective: NaiveDate,
    ) -> StoreResult<Employee> {
        let mut tables = self.tables.write();
        let row = tables
            .employees
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("employee {id}")))?;
        let moved = update.changes_position(row);
        if let Some(first_name) = update.first_name {
            row.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            row.last_name = last_name;
        }
        if let Some(grade) = update.grade {
            row.grade = grade;
        }
        if let Some(grade_index) = update.grade_index {
            row.grade_index = grade_index;
        }
        if let Some(service) = update.service {
            row.service = service;
        }
        if let Some(department) = update.department {
            row.department = department;
        }
        if let Some(entry_date) = update.entry_date {
            row.entry_date = entry_date;
        }
        if update.phone.is_some() {
            row.phone = update.phone;
        }
        if update.email.is_some() {
            row.email = update.email;
        }
        if let Some(active) = update.is_active {
            row.is_active = active;
        }
        let updated = row.clone();

        if moved {
            for event in tables
                .career
                .values_mut()
                .filter(|e| e.employee_id == id && e.is_current)
            {
                event.is_current = false;
                event.end_date = Some(effective);
            }
            tables.open_career_event(id, &updated.grade, &updated.service, effective);
        }
        Ok(updated)
    }

    async fn delete_employee(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.employees.contains_key(&id) {
            return Err(StoreError::NotFound(format!("employee {id}")));
        }
        let referenced = tables.salary_records.values().any(|r| r.employee_id == id)
            || tables.complaints.values().any(|c| c.employee_id == id);
        if referenced {
            return Err(StoreError::Referenced(format!("employee {id}")));
        }
        tables.employees.remove(&id);
        tables.career.retain(|_, e| e.employee_id != id);
        Ok(())
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        Ok(self.tables.read().employees.values().cloned().collect())
    }

    async fn employee_departments(&self) -> StoreResult<Vec<String>> {
        let tables = self.tables.read();
        let mut departments: Vec<String> = tables
            .employees
            .values()
            .map(|e| e.department.clone())
            .collect();
        departments.sort();
        departments.dedup();
        Ok(departments)
    }

    async fn search_employees(&self, query: &str) -> StoreResult<Vec<Employee>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read();
        Ok(tables
            .employees
            .values()
            .filter(|e| matches_search(&needle, [e.matricule.as_str(), e.first_name.as_str(), e.last_name.as_str()]))
            .cloned()
            .collect())
    }

    async fn career_history(&self, employee_id: i64) -> StoreResult<Vec<CareerEvent>> {
        let tables = self.tables.read();
        let mut events: Vec<CareerEvent> = tables
            .career
            .values()
            .filter(|e| e.employee_id == employee_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(events)
    }

    async fn list_grade_rates(&self) -> StoreResult<Vec<GradeRate>> {
        let mut rates: Vec<GradeRate> = self.tables.read().grade_rates.values().cloned().collect();
        rates.sort_by(|a, b| a.grade.cmp(&b.grade));
        Ok(rates)
    }

    async fn get_grade_rate(&self, grade: &str) -> StoreResult<Option<GradeRate>> {
        let tables = self.tables.read();
        Ok(tables
            .grade_rates
            .values()
            .find(|r| r.grade == grade)
            .cloned())
    }

    async fn create_grade_rate(&self, rate: GradeRateCreate) -> StoreResult<GradeRate> {
        let mut tables = self.tables.write();
        if tables.grade_rates.values().any(|r| r.grade == rate.grade) {
            return Err(StoreError::Duplicate(format!("grade rate {}", rate.grade)));
        }
        let id = tables.next_id();
        let row = GradeRate {
            id,
            grade: rate.grade,
            cnss_rate: rate.cnss_rate,
            ipts_rate: rate.ipts_rate,
            updated_at: now_millis(),
        };
        tables.grade_rates.insert(id, row.clone());
        Ok(row)
    }

    async fn update_grade_rate(&self, id: i64, update: GradeRateUpdate) -> StoreResult<GradeRate> {
        let mut tables = self.tables.write();
        if let Some(grade) = &update.grade
            && tables
                .grade_rates
                .values()
                .any(|r| r.id != id && &r.grade == grade)
        {
            return Err(StoreError::Duplicate(format!("grade rate {grade}")));
        }
        let row = tables
            .grade_rates
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("grade rate {id}")))?;
        if let Some(grade) = update.grade {
            row.grade = grade;
        }
        if let Some(cnss) = update.cnss_rate {
            row.cnss_rate = cnss;
        }
        if let Some(ipts) = update.ipts_rate {
            row.ipts_rate = ipts;
        }
        row.updated_at = now_millis();
        Ok(row.clone())
    }

    async fn delete_grade_rate(&self, id: i64) -> StoreResult<()> {
        self.tables
            .write()
            .grade_rates
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("grade rate {id}")))
    }

    async fn create_salary_record(&self, record: NewSalaryRecord) -> StoreResult<SalaryRecord> {
        let mut tables = self.tables.write();
        if !tables.employees.contains_key(&record.employee_id) {
            return Err(StoreError::NotFound(format!(
                "employee {}",
                record.employee_id
            )));
        }
        let id = tables.next_id();
        let row = SalaryRecord {
            id,
            employee_id: record.employee_id,
            period: record.period,
            start_date: record.start_date,
            end_date: record.end_date,
            duration_days: record.duration_days,
            base_salary: record.base_salary,
            allowance: record.allowance,
            cnss_amount: record.cnss_amount,
            ipts_amount: record.ipts_amount,
            net_salary: record.net_salary,
            recall_amount: record.recall_amount,
            liquidated_amount: record.liquidated_amount,
            payment_status: record.payment_status,
            observations: record.observations,
            created_at: now_millis(),
            created_by: record.created_by,
            version: 1,
        };
        tables.salary_records.insert(id, row.clone());
        Ok(row)
    }

    async fn get_salary_record(&self, id: i64) -> StoreResult<Option<SalaryRecord>> {
        Ok(self.tables.read().salary_records.get(&id).cloned())
    }

    async fn update_salary_record(&self, record: SalaryRecord) -> StoreResult<SalaryRecord> {
        let mut tables = self.tables.write();
        let row = tables
            .salary_records
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::NotFound(format!("salary record {}", record.id)))?;
        if row.version != record.version {
            return Err(StoreError::Conflict(format!(
                "salary record {} is at version {}",
                record.id, row.version
            )));
        }
        // employee and creation stamp are immutable
        let kept = (row.employee_id, row.created_at, row.created_by);
        *row = record;
        (row.employee_id, row.created_at, row.created_by) = kept;
        row.version += 1;
        Ok(row.clone())
    }

    async fn list_salary_records(&self) -> StoreResult<Vec<SalaryRecord>> {
        Ok(self.tables.read().salary_records.values().cloned().collect())
    }

    async fn list_salary_records_for_employee(
        &self,
        employee_id: i64,
    ) -> StoreResult<Vec<SalaryRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .salary_records
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<Complaint> {
        let mut tables = self.tables.write();
        if !tables.employees.contains_key(&complaint.employee_id) {
            return Err(StoreError::NotFound(format!(
                "employee {}",
                complaint.employee_id
            )));
        }
        let id = tables.next_id();
        let row = Complaint {
            id,
            employee_id: complaint.employee_id,
            complaint_type: complaint.complaint_type,
            description: complaint.description,
            period_start: complaint.period_start,
            period_end: complaint.period_end,
            attachments: complaint.attachments,
            status: ComplaintStatus::Pending,
            resolved_at: None,
            resolved_by: None,
            created_at: now_millis(),
        };
        tables.complaints.insert(id, row.clone());
        Ok(row)
    }

    async fn get_complaint(&self, id: i64) -> StoreResult<Option<Complaint>> {
        Ok(self.tables.read().complaints.get(&id).cloned())
    }

    async fn update_complaint(&self, id: i64, edit: ComplaintEdit) -> StoreResult<Complaint> {
        let mut tables = self.tables.write();
        let row = tables.complaint_mut(id)?;
        if row.status.is_terminal() {
            return Err(StoreError::Conflict(format!("complaint {id} is resolved")));
        }
        row.complaint_type = edit.complaint_type;
        row.description = edit.description;
        row.period_start = edit.period_start;
        row.period_end = edit.period_end;
        row.attachments = edit.attachments;
        Ok(row.clone())
    }

    async fn set_complaint_status(
        &self,
        id: i64,
        change: StatusChange,
    ) -> StoreResult<Complaint> {
        let mut tables = self.tables.write();
        let row = tables.complaint_mut(id)?;
        if row.status != change.from {
            return Err(StoreError::Conflict(format!(
                "complaint {id} is {}",
                row.status.as_str()
            )));
        }
        row.status = change.to;
        row.resolved_at = change.resolved_at;
        row.resolved_by = change.resolved_by;
        Ok(row.clone())
    }

    async fn delete_complaint(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.complaint_mut(id)?.status.is_terminal() {
            return Err(StoreError::Conflict(format!("complaint {id} is resolved")));
        }
        tables.complaints.remove(&id);
        Ok(())
    }

    async fn list_complaints(&self, status: Option<ComplaintStatus>) -> StoreResult<Vec<Complaint>> {
        let tables = self.tables.read();
        // Newest first
        Ok(tables
            .complaints
            .values()
            .rev()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect())
    }

    async fn list_complaints_for_employee(&self, employee_id: i64) -> StoreResult<Vec<Complaint>> {
        let tables = self.tables.read();
        Ok(tables
            .complaints
            .values()
            .rev()
            .filter(|c| c.employee_id == employee_id)
            .cloned()
            .collect())
    }
}
