//! Store wrapper that hands control back to the scheduler after reads
//!
//! Two requests joined on one task then both read before either writes,
//! which is the interleaving conditional writes have to survive.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use payroll_server::db::{
    ComplaintEdit, MemoryStore, NewComplaint, NewSalaryRecord, NewUser, PayrollStore,
    StatusChange, StoreResult, UserChanges,
};
use shared::models::{
    CareerEvent, Complaint, ComplaintStatus, Employee, EmployeeCreate, EmployeeUpdate, GradeRate,
    GradeRateCreate, GradeRateUpdate, SalaryRecord, User, UserQuery,
};

pub struct YieldingStore(pub Arc<MemoryStore>);

#[async_trait]
impl PayrollStore for YieldingStore {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.0.get_user(id).await
    }
    async fn find_user_by_matricule(&self, matricule: &str) -> StoreResult<Option<User>> {
        self.0.find_user_by_matricule(matricule).await
    }
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.0.create_user(user).await
    }
    async fn list_users(&self, query: &UserQuery) -> StoreResult<(Vec<User>, u64)> {
        self.0.list_users(query).await
    }
    async fn update_user(&self, id: i64, changes: UserChanges) -> StoreResult<User> {
        self.0.update_user(id, changes).await
    }
    async fn delete_user(&self, id: i64) -> StoreResult<()> {
        self.0.delete_user(id).await
    }
    async fn admin_user_ids(&self) -> StoreResult<Vec<i64>> {
        self.0.admin_user_ids().await
    }

    async fn get_employee(&self, id: i64) -> StoreResult<Option<Employee>> {
        self.0.get_employee(id).await
    }
    async fn find_employee_by_matricule(&self, matricule: &str) -> StoreResult<Option<Employee>> {
        self.0.find_employee_by_matricule(matricule).await
    }
    async fn create_employee(&self, employee: EmployeeCreate) -> StoreResult<Employee> {
        self.0.create_employee(employee).await
    }
    async fn update_employee(
        &self,
        id: i64,
        update: EmployeeUpdate,
        effective: NaiveDate,
    ) -> StoreResult<Employee> {
        self.0.update_employee(id, update, effective).await
    }
    async fn delete_employee(&self, id: i64) -> StoreResult<()> {
        self.0.delete_employee(id).await
    }
    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        self.0.list_employees().await
    }
    async fn employee_departments(&self) -> StoreResult<Vec<String>> {
        self.0.employee_departments().await
    }
    async fn search_employees(&self, query: &str) -> StoreResult<Vec<Employee>> {
        self.0.search_employees(query).await
    }
    async fn career_history(&self, employee_id: i64) -> StoreResult<Vec<CareerEvent>> {
        self.0.career_history(employee_id).await
    }

    async fn list_grade_rates(&self) -> StoreResult<Vec<GradeRate>> {
        self.0.list_grade_rates().await
    }
    async fn get_grade_rate(&self, grade: &str) -> StoreResult<Option<GradeRate>> {
        self.0.get_grade_rate(grade).await
    }
    async fn create_grade_rate(&self, rate: GradeRateCreate) -> StoreResult<GradeRate> {
        self.0.create_grade_rate(rate).await
    }
    async fn update_grade_rate(&self, id: i64, update: GradeRateUpdate) -> StoreResult<GradeRate> {
        self.0.update_grade_rate(id, update).await
    }
    async fn delete_grade_rate(&self, id: i64) -> StoreResult<()> {
        self.0.delete_grade_rate(id).await
    }

    async fn create_salary_record(&self, record: NewSalaryRecord) -> StoreResult<SalaryRecord> {
        self.0.create_salary_record(record).await
    }
    async fn get_salary_record(&self, id: i64) -> StoreResult<Option<SalaryRecord>> {
        let record = self.0.get_salary_record(id).await;
        tokio::task::yield_now().await;
        record
    }
    async fn update_salary_record(&self, record: SalaryRecord) -> StoreResult<SalaryRecord> {
        self.0.update_salary_record(record).await
    }
    async fn list_salary_records(&self) -> StoreResult<Vec<SalaryRecord>> {
        self.0.list_salary_records().await
    }
    async fn list_salary_records_for_employee(
        &self,
        employee_id: i64,
    ) -> StoreResult<Vec<SalaryRecord>> {
        self.0.list_salary_records_for_employee(employee_id).await
    }

    async fn create_complaint(&self, complaint: NewComplaint) -> StoreResult<Complaint> {
        self.0.create_complaint(complaint).await
    }
    async fn get_complaint(&self, id: i64) -> StoreResult<Option<Complaint>> {
        let complaint = self.0.get_complaint(id).await;
        tokio::task::yield_now().await;
        complaint
    }
    async fn update_complaint(&self, id: i64, edit: ComplaintEdit) -> StoreResult<Complaint> {
        self.0.update_complaint(id, edit).await
    }
    async fn set_complaint_status(
        &self,
        id: i64,
        change: StatusChange,
    ) -> StoreResult<Complaint> {
        self.0.set_complaint_status(id, change).await
    }
    async fn delete_complaint(&self, id: i64) -> StoreResult<()> {
        self.0.delete_complaint(id).await
    }
    async fn list_complaints(&self, status: Option<ComplaintStatus>) -> StoreResult<Vec<Complaint>> {
        self.0.list_complaints(status).await
    }
    async fn list_complaints_for_employee(&self, employee_id: i64) -> StoreResult<Vec<Complaint>> {
        self.0.list_complaints_for_employee(employee_id).await
    }
}
