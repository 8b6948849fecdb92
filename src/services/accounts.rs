use crate::db::{self, DbSecurityQuestion, DbUser, NewUser};
use crate::domain::models::{User, UserRole};
use crate::error::{AppError, AppResult};
use crate::services::credentials::{
    check_password_policy, hash_secret, normalize_answer, verify_secret, SECURITY_QUESTION_COUNT,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
    pub employee_code: Option<String>,
    #[serde(default)]
    pub security_questions: Vec<SecurityAnswer>,
}

fn check_email(email: &str) -> AppResult<()> {
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(AppError::validation("email address is not valid"))
    }
}

pub fn check_registration(reg: &Registration) -> AppResult<()> {
    if reg.name.trim().is_empty() {
        return Err(AppError::validation("name must not be blank"));
    }
    check_email(reg.email.trim())?;
    check_password_policy(&reg.password)?;
    if reg.security_questions.len() != SECURITY_QUESTION_COUNT {
        return Err(AppError::validation(format!(
            "exactly {SECURITY_QUESTION_COUNT} security questions are required"
        )));
    }
    if reg
        .security_questions
        .iter()
        .any(|q| q.question.trim().is_empty() || q.answer.trim().is_empty())
    {
        return Err(AppError::validation("security questions and answers must not be blank"));
    }
    let distinct: HashSet<&str> = reg.security_questions.iter().map(|q| q.question.trim()).collect();
    if distinct.len() != reg.security_questions.len() {
        return Err(AppError::validation("security questions must be distinct"));
    }
    Ok(())
}

impl Registration {
    pub fn effective_role(&self) -> UserRole {
        self.role.unwrap_or(UserRole::Employee)
    }
}

/// Open sign-up only creates employee accounts; other roles are granted by HR.
pub fn check_self_registration(reg: &Registration) -> AppResult<()> {
    match reg.role {
        None | Some(UserRole::Employee) => Ok(()),
        Some(role) => Err(AppError::Forbidden(format!(
            "self registration cannot request the {} role",
            role.as_str()
        ))),
    }
}

pub async fn self_register(pool: &PgPool, reg: &Registration) -> AppResult<User> {
    check_self_registration(reg)?;
    register(pool, reg).await
}

pub async fn register(pool: &PgPool, reg: &Registration) -> AppResult<User> {
    check_registration(reg)?;
    let email = reg.email.trim();
    if db::find_user_by_email(pool, email).await?.is_some() {
        return Err(AppError::validation("email already registered"));
    }

    let password_hash = hash_secret(&reg.password)?;
    let mut tx = pool.begin().await?;
    let user = db::insert_user(
        &mut tx,
        &NewUser {
            employee_code: reg.employee_code.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            name: reg.name.trim(),
            email,
            password_hash: &password_hash,
            role: reg.effective_role(),
        },
    )
    .await?;
    for q in &reg.security_questions {
        let answer_hash = hash_secret(&normalize_answer(&q.answer))?;
        db::insert_security_question(&mut tx, user.id, q.question.trim(), &answer_hash).await?;
    }
    tx.commit().await?;

    tracing::info!("Registered user {} as {}", user.id, user.role.as_str());
    Ok(user.profile())
}

/// Password login; unknown email and wrong password are indistinguishable.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> AppResult<DbUser> {
    let rejected = || AppError::Unauthorized("invalid email or password".to_string());
    let user = db::find_user_by_email(pool, email.trim())
        .await?
        .ok_or_else(rejected)?;
    if !verify_secret(password, &user.password_hash) {
        return Err(rejected());
    }
    if !user.is_active {
        return Err(AppError::Forbidden("account is inactive".to_string()));
    }
    Ok(user)
}

/// Each stored question must be answered exactly once, and correctly.
pub fn check_answer_set(stored: &[DbSecurityQuestion], supplied: &[SecurityAnswer]) -> AppResult<()> {
    if supplied.len() != SECURITY_QUESTION_COUNT || supplied.len() != stored.len() {
        return Err(AppError::validation(format!(
            "all {SECURITY_QUESTION_COUNT} security questions must be answered"
        )));
    }
    let mut seen = HashSet::new();
    for answer in supplied {
        let question = answer.question.trim();
        if !seen.insert(question) {
            return Err(AppError::validation("each security question may be answered only once"));
        }
        let matched = stored
            .iter()
            .find(|s| s.question.trim() == question)
            .map(|s| verify_secret(&normalize_answer(&answer.answer), &s.answer_hash))
            .unwrap_or(false);
        if !matched {
            return Err(AppError::validation("security answers do not match"));
        }
    }
    Ok(())
}

pub async fn verify_security_answers(
    pool: &PgPool,
    email: &str,
    answers: &[SecurityAnswer],
) -> AppResult<DbUser> {
    let user = db::find_user_by_email(pool, email.trim())
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let stored = db::security_questions_for(pool, user.id).await?;
    check_answer_set(&stored, answers).map_err(|e| {
        tracing::warn!("Security answer check failed for user {}", user.id);
        e
    })?;
    Ok(user)
}

pub async fn reset_password(
    pool: &PgPool,
    email: &str,
    answers: &[SecurityAnswer],
    new_password: &str,
) -> AppResult<()> {
    check_password_policy(new_password)?;
    let user = verify_security_answers(pool, email, answers).await?;
    let hash = hash_secret(new_password)?;
    db::update_password(pool, user.id, &hash).await?;
    tracing::info!("Password reset for user {}", user.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(questions: usize) -> Registration {
        Registration {
            name: "Dana Reviewer".to_string(),
            email: "dana@company.com".to_string(),
            password: "Sup3rSecret".to_string(),
            role: None,
            employee_code: None,
            security_questions: (0..questions)
                .map(|i| SecurityAnswer {
                    question: format!("question {i}"),
                    answer: format!("answer {i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn three_questions_are_required() {
        assert!(check_registration(&registration(3)).is_ok());
        assert!(check_registration(&registration(2)).is_err());
        assert!(check_registration(&registration(4)).is_err());
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut reg = registration(3);
        reg.email = "not-an-email".to_string();
        assert!(matches!(check_registration(&reg), Err(AppError::Validation(_))));
    }

    #[test]
    fn short_password_is_rejected() {
        let mut reg = registration(3);
        reg.password = "1234567".to_string();
        assert!(check_registration(&reg).is_err());
    }

    #[test]
    fn role_is_parsed_from_uppercase_name() {
        let body = serde_json::json!({
            "name": "M", "email": "m@company.com", "password": "password1",
            "role": "MANAGER", "security_questions": []
        });
        let reg: Registration = serde_json::from_value(body).unwrap();
        assert_eq!(reg.effective_role(), UserRole::Manager);
    }

    #[test]
    fn missing_role_means_employee() {
        assert_eq!(registration(3).effective_role(), UserRole::Employee);
    }

    #[test]
    fn repeated_registration_question_is_rejected() {
        let mut reg = registration(3);
        reg.security_questions[2].question = "question 0".to_string();
        assert!(matches!(check_registration(&reg), Err(AppError::Validation(_))));
    }

    #[test]
    fn open_sign_up_refuses_privileged_roles() {
        let mut reg = registration(3);
        assert!(check_self_registration(&reg).is_ok());
        reg.role = Some(UserRole::Employee);
        assert!(check_self_registration(&reg).is_ok());
        for role in [UserRole::Hr, UserRole::Manager, UserRole::Panel] {
            reg.role = Some(role);
            assert!(matches!(check_self_registration(&reg), Err(AppError::Forbidden(_))));
        }
    }

    fn stored_questions() -> Vec<DbSecurityQuestion> {
        let user_id = uuid::Uuid::new_v4();
        ["First pet?", "Birth city?", "Street you grew up on?"]
            .iter()
            .zip(["Rex", "Lviv", "Shevchenka"])
            .map(|(q, a)| DbSecurityQuestion {
                id: uuid::Uuid::new_v4(),
                user_id,
                question: q.to_string(),
                answer_hash: hash_secret(&normalize_answer(a)).unwrap(),
            })
            .collect()
    }

    fn answer(question: &str, answer: &str) -> SecurityAnswer {
        SecurityAnswer {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn full_answer_set_passes_with_loose_spelling() {
        let stored = stored_questions();
        let supplied = vec![
            answer("Birth city?", "  lviv "),
            answer("First pet?", "REX"),
            answer("Street you grew up on?", "  shevchenka"),
        ];
        assert!(check_answer_set(&stored, &supplied).is_ok());
    }

    #[test]
    fn partial_answer_set_is_rejected() {
        let stored = stored_questions();
        let supplied = vec![answer("First pet?", "Rex")];
        assert!(matches!(check_answer_set(&stored, &supplied), Err(AppError::Validation(_))));
    }

    #[test]
    fn repeated_question_cannot_stand_in_for_the_others() {
        let stored = stored_questions();
        let supplied = vec![
            answer("First pet?", "Rex"),
            answer("First pet?", "Rex"),
            answer("First pet?", "Rex"),
        ];
        let err = check_answer_set(&stored, &supplied).unwrap_err();
        assert_eq!(err.to_string(), "each security question may be answered only once");
    }

    #[test]
    fn one_wrong_answer_fails_the_set() {
        let stored = stored_questions();
        let supplied = vec![
            answer("First pet?", "Rex"),
            answer("Birth city?", "Kyiv"),
            answer("Street you grew up on?", "Shevchenka"),
        ];
        let err = check_answer_set(&stored, &supplied).unwrap_err();
        assert_eq!(err.to_string(), "security answers do not match");
    }
}
