//! Startup bootstrap: default grade rates and the optional admin account

use shared::models::{GradeRateCreate, Role};

use super::{NewUser, PayrollStore, StoreError, StoreResult};
use crate::config::BootstrapAdmin;
use crate::util::hash_password;

/// Grade rates every fresh installation starts with: (grade, cnss %, ipts %)
pub const DEFAULT_GRADE_RATES: &[(&str, f64, f64)] = &[
    ("Agent Principal", 10.0, 8.0),
    ("Secrétaire", 9.0, 7.0),
    ("Chef de Service", 12.0, 10.0),
];

/// Insert missing default grade rates; existing grades are left untouched.
/// Returns the number of rates created.
pub async fn ensure_default_grade_rates(store: &dyn PayrollStore) -> StoreResult<usize> {
    let mut created = 0;
    for &(grade, cnss_rate, ipts_rate) in DEFAULT_GRADE_RATES {
        if store.get_grade_rate(grade).await?.is_some() {
            continue;
        }
        match store
            .create_grade_rate(GradeRateCreate {
                grade: grade.to_string(),
                cnss_rate,
                ipts_rate,
            })
            .await
        {
            Ok(_) => created += 1,
            // Another instance seeded it first
            Err(StoreError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
    }
    if created > 0 {
        tracing::info!(created, "Default grade rates seeded");
    }
    Ok(created)
}

/// Create the configured admin account when its matricule is unknown
pub async fn ensure_admin(store: &dyn PayrollStore, admin: &BootstrapAdmin) -> StoreResult<()> {
    if store.find_user_by_matricule(&admin.matricule).await?.is_some() {
        return Ok(());
    }
    let password_hash = hash_password(&admin.password)
        .map_err(|e| StoreError::Database(format!("Failed to hash password: {e}")))?;
    store
        .create_user(NewUser {
            matricule: admin.matricule.clone(),
            password_hash,
            role: Role::Admin,
            first_name: "Admin".into(),
            last_name: "System".into(),
            phone: None,
            email: None,
        })
        .await?;
    tracing::info!(matricule = %admin.matricule, "Bootstrap admin account created");
    Ok(())
}
