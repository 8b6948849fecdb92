pub mod seed;

use crate::domain::form_schema::AnswerInput;
use crate::domain::models::{
    Award, Cycle, CycleStatus, FieldType, Form, FormAnswer, FormField, Nomination,
    NominationStatus, PanelReview, User, UserRole,
};
use crate::domain::workflow::StatusChange;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, employee_code, name, email, password_hash, role, is_active, created_at";
const CYCLE_COLUMNS: &str = "id, name, description, quarter, year, start_date, end_date, \
     status, is_active, created_at, updated_at";
const NOMINATION_COLUMNS: &str = "id, cycle_id, form_id, nominee_id, nominated_by_id, \
     status, submitted_at, created_at, updated_at";
const AWARD_COLUMNS: &str = "id, cycle_id, nomination_id, winner_id, award_type, rank, \
     comment, created_at, updated_at, finalized_at";

/// Account row including the credential hash; never serialized to callers.
#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: Uuid,
    pub employee_code: Option<String>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl DbUser {
    pub fn profile(&self) -> User {
        User {
            id: self.id,
            employee_code: self.employee_code.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            is_active: self.is_active,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbSecurityQuestion {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub answer_hash: String,
}

pub struct NewUser<'a> {
    pub employee_code: Option<&'a str>,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: UserRole,
}

#[derive(Debug, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub employee_code: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

// ============================================
// Users
// ============================================

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id<'e, E>(ex: E, id: Uuid) -> Result<Option<DbUser>>
where
    E: PgExecutor<'e>,
{
    let user = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(user)
}

pub async fn insert_user(conn: &mut PgConnection, user: &NewUser<'_>) -> Result<DbUser> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        INSERT INTO users (id, employee_code, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(user.employee_code)
    .bind(user.name)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.role)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_security_question(
    conn: &mut PgConnection,
    user_id: Uuid,
    question: &str,
    answer_hash: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO security_questions (id, user_id, question, answer_hash)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(question)
    .bind(answer_hash)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn security_questions_for(pool: &PgPool, user_id: Uuid) -> Result<Vec<DbSecurityQuestion>> {
    let rows = sqlx::query_as::<_, DbSecurityQuestion>(
        r#"
        SELECT id, user_id, question, answer_hash
        FROM security_questions
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_password(pool: &PgPool, user_id: Uuid, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_users(
    pool: &PgPool,
    role: Option<UserRole>,
    skip: i64,
    limit: i64,
) -> Result<Vec<DbUser>> {
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE is_active = true
          AND ($1::user_role IS NULL OR role = $1)
        ORDER BY created_at
        OFFSET $2 LIMIT $3
        "#
    ))
    .bind(role)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_user(pool: &PgPool, id: Uuid, patch: &UserPatch) -> Result<Option<DbUser>> {
    let row = sqlx::query_as::<_, DbUser>(&format!(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            employee_code = COALESCE($3, employee_code),
            role = COALESCE($4, role),
            is_active = COALESCE($5, is_active),
            updated_at = now()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.employee_code.as_deref())
    .bind(patch.role)
    .bind(patch.is_active)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Soft delete; returns false when no active user matched.
pub async fn deactivate_user(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE users SET is_active = false, updated_at = now() WHERE id = $1 AND is_active = true",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ============================================
// Cycles
// ============================================

pub struct NewCycle<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub quarter: &'a str,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: CycleStatus,
}

#[derive(Debug, Default)]
pub struct CyclePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<CycleStatus>,
}

pub async fn insert_cycle(pool: &PgPool, cycle: &NewCycle<'_>) -> Result<Cycle> {
    let row = sqlx::query_as::<_, Cycle>(&format!(
        r#"
        INSERT INTO cycles (id, name, description, quarter, year, start_date, end_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {CYCLE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(cycle.name)
    .bind(cycle.description)
    .bind(cycle.quarter)
    .bind(cycle.year)
    .bind(cycle.start_date)
    .bind(cycle.end_date)
    .bind(cycle.status)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

pub async fn find_cycle<'e, E>(ex: E, id: Uuid) -> Result<Option<Cycle>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Cycle>(&format!(
        "SELECT {CYCLE_COLUMNS} FROM cycles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

pub async fn lock_cycle(conn: &mut PgConnection, id: Uuid) -> Result<Option<Cycle>> {
    let row = sqlx::query_as::<_, Cycle>(&format!(
        "SELECT {CYCLE_COLUMNS} FROM cycles WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn list_cycles(
    pool: &PgPool,
    status: Option<CycleStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Cycle>> {
    let rows = sqlx::query_as::<_, Cycle>(&format!(
        r#"
        SELECT {CYCLE_COLUMNS}
        FROM cycles
        WHERE is_active = true
          AND ($1::cycle_status IS NULL OR status = $1)
        ORDER BY year DESC, start_date DESC
        OFFSET $2 LIMIT $3
        "#
    ))
    .bind(status)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn update_cycle(conn: &mut PgConnection, id: Uuid, patch: &CyclePatch) -> Result<Cycle> {
    let row = sqlx::query_as::<_, Cycle>(&format!(
        r#"
        UPDATE cycles
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            start_date = COALESCE($4, start_date),
            end_date = COALESCE($5, end_date),
            status = COALESCE($6, status),
            updated_at = now()
        WHERE id = $1
        RETURNING {CYCLE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.start_date)
    .bind(patch.end_date)
    .bind(patch.status)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn set_cycle_status(conn: &mut PgConnection, id: Uuid, status: CycleStatus) -> Result<()> {
    sqlx::query("UPDATE cycles SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn open_cycles(pool: &PgPool) -> Result<Vec<Cycle>> {
    let rows = sqlx::query_as::<_, Cycle>(&format!(
        "SELECT {CYCLE_COLUMNS} FROM cycles WHERE status = 'OPEN'"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Moves still-OPEN cycles among `ids` to CLOSED; returns how many changed.
pub async fn close_cycles(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE cycles
        SET status = 'CLOSED', updated_at = now()
        WHERE id = ANY($1) AND status = 'OPEN'
        "#,
    )
    .bind(ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

// ============================================
// Forms
// ============================================

pub struct NewField<'a> {
    pub label: &'a str,
    pub field_key: &'a str,
    pub field_type: FieldType,
    pub is_required: bool,
    pub order_index: i32,
    pub options: Option<&'a Value>,
    pub ui_schema: Option<&'a Value>,
    pub validation_rules: Option<&'a Value>,
}

#[derive(Debug, Default)]
pub struct FormPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn form_name_taken(conn: &mut PgConnection, cycle_id: Uuid, name: &str) -> Result<bool> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM forms WHERE cycle_id = $1 AND lower(name) = lower($2))",
    )
    .bind(cycle_id)
    .bind(name)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

pub async fn insert_form(
    conn: &mut PgConnection,
    cycle_id: Uuid,
    name: &str,
    description: Option<&str>,
) -> Result<Form> {
    let row = sqlx::query_as::<_, Form>(
        r#"
        INSERT INTO forms (id, cycle_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING id, cycle_id, name, description, is_active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cycle_id)
    .bind(name)
    .bind(description)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_field(conn: &mut PgConnection, form_id: Uuid, field: &NewField<'_>) -> Result<FormField> {
    let row = sqlx::query_as::<_, FormField>(
        r#"
        INSERT INTO form_fields
            (id, form_id, label, field_key, field_type, is_required, order_index,
             options, ui_schema, validation_rules)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, form_id, label, field_key, field_type, is_required, order_index,
                  options, ui_schema, validation_rules
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(form_id)
    .bind(field.label)
    .bind(field.field_key)
    .bind(field.field_type)
    .bind(field.is_required)
    .bind(field.order_index)
    .bind(field.options)
    .bind(field.ui_schema)
    .bind(field.validation_rules)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn find_form<'e, E>(ex: E, id: Uuid) -> Result<Option<Form>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Form>(
        "SELECT id, cycle_id, name, description, is_active, created_at FROM forms WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

pub async fn list_forms(
    pool: &PgPool,
    cycle_id: Option<Uuid>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Form>> {
    let rows = sqlx::query_as::<_, Form>(
        r#"
        SELECT id, cycle_id, name, description, is_active, created_at
        FROM forms
        WHERE ($1::uuid IS NULL OR cycle_id = $1)
        ORDER BY created_at DESC
        OFFSET $2 LIMIT $3
        "#,
    )
    .bind(cycle_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Latest active form attached to a cycle.
pub async fn active_form_for_cycle(pool: &PgPool, cycle_id: Uuid) -> Result<Option<Form>> {
    let row = sqlx::query_as::<_, Form>(
        r#"
        SELECT id, cycle_id, name, description, is_active, created_at
        FROM forms
        WHERE cycle_id = $1 AND is_active = true
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(cycle_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn fields_for_form<'e, E>(ex: E, form_id: Uuid) -> Result<Vec<FormField>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, FormField>(
        r#"
        SELECT id, form_id, label, field_key, field_type, is_required, order_index,
               options, ui_schema, validation_rules
        FROM form_fields
        WHERE form_id = $1
        ORDER BY order_index, label
        "#,
    )
    .bind(form_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn update_form(pool: &PgPool, id: Uuid, patch: &FormPatch) -> Result<Option<Form>> {
    let row = sqlx::query_as::<_, Form>(
        r#"
        UPDATE forms
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            is_active = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING id, cycle_id, name, description, is_active, created_at
        "#,
    )
    .bind(id)
    .bind(patch.name.as_deref())
    .bind(patch.description.as_deref())
    .bind(patch.is_active)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// ============================================
// Nominations
// ============================================

pub struct NewNomination {
    pub cycle_id: Uuid,
    pub form_id: Uuid,
    pub nominee_id: Uuid,
    pub nominated_by_id: Uuid,
    pub status: NominationStatus,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Visibility and query filters for nomination listings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NominationFilter {
    pub cycle_id: Option<Uuid>,
    pub status: Option<NominationStatus>,
    pub nominated_by: Option<Uuid>,
    /// Restricts to nominations in PANEL_REVIEW or already reviewed by this member.
    pub reviewer: Option<Uuid>,
}

pub async fn find_nomination<'e, E>(ex: E, id: Uuid) -> Result<Option<Nomination>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Nomination>(&format!(
        "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(ex)
    .await?;
    Ok(row)
}

pub async fn lock_nomination(conn: &mut PgConnection, id: Uuid) -> Result<Option<Nomination>> {
    let row = sqlx::query_as::<_, Nomination>(&format!(
        "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn find_nomination_for_nominee(
    conn: &mut PgConnection,
    cycle_id: Uuid,
    nominee_id: Uuid,
) -> Result<Option<Nomination>> {
    let row = sqlx::query_as::<_, Nomination>(&format!(
        "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE cycle_id = $1 AND nominee_id = $2"
    ))
    .bind(cycle_id)
    .bind(nominee_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn insert_nomination(conn: &mut PgConnection, n: &NewNomination) -> Result<Nomination> {
    let row = sqlx::query_as::<_, Nomination>(&format!(
        r#"
        INSERT INTO nominations
            (id, cycle_id, form_id, nominee_id, nominated_by_id, status, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {NOMINATION_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(n.cycle_id)
    .bind(n.form_id)
    .bind(n.nominee_id)
    .bind(n.nominated_by_id)
    .bind(n.status)
    .bind(n.submitted_at)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Replaces the whole answer set of a nomination.
pub async fn replace_answers(
    conn: &mut PgConnection,
    nomination_id: Uuid,
    answers: &[AnswerInput],
) -> Result<()> {
    sqlx::query("DELETE FROM form_answers WHERE nomination_id = $1")
        .bind(nomination_id)
        .execute(&mut *conn)
        .await?;
    for answer in answers {
        sqlx::query(
            r#"
            INSERT INTO form_answers (id, nomination_id, field_key, value)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(nomination_id)
        .bind(&answer.field_key)
        .bind(&answer.value)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn answers_for<'e, E>(ex: E, nomination_id: Uuid) -> Result<Vec<FormAnswer>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, FormAnswer>(
        r#"
        SELECT id, nomination_id, field_key, value
        FROM form_answers
        WHERE nomination_id = $1
        ORDER BY field_key
        "#,
    )
    .bind(nomination_id)
    .fetch_all(ex)
    .await?;
    Ok(rows)
}

pub async fn list_nominations(pool: &PgPool, filter: &NominationFilter) -> Result<Vec<Nomination>> {
    let rows = sqlx::query_as::<_, Nomination>(&format!(
        r#"
        SELECT {NOMINATION_COLUMNS}
        FROM nominations n
        WHERE ($1::uuid IS NULL OR n.cycle_id = $1)
          AND ($2::nomination_status IS NULL OR n.status = $2)
          AND ($3::uuid IS NULL OR n.nominated_by_id = $3)
          AND ($4::uuid IS NULL
               OR n.status = 'PANEL_REVIEW'
               OR EXISTS (
                   SELECT 1 FROM panel_reviews r
                   WHERE r.nomination_id = n.id AND r.panel_member_id = $4
               ))
        ORDER BY n.created_at DESC
        "#
    ))
    .bind(filter.cycle_id)
    .bind(filter.status)
    .bind(filter.nominated_by)
    .bind(filter.reviewer)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn has_reviewed(pool: &PgPool, nomination_id: Uuid, member_id: Uuid) -> Result<bool> {
    let reviewed: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM panel_reviews
            WHERE nomination_id = $1 AND panel_member_id = $2
        )
        "#,
    )
    .bind(nomination_id)
    .bind(member_id)
    .fetch_one(pool)
    .await?;
    Ok(reviewed)
}

/// Compare-and-set status write; 0 means the row moved on since it was read.
pub async fn apply_status_change(
    conn: &mut PgConnection,
    id: Uuid,
    expected: NominationStatus,
    change: &StatusChange,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE nominations
        SET status = $3, submitted_at = $4, updated_at = $5
        WHERE id = $1 AND status = $2
        "#,
    )
    .bind(id)
    .bind(expected)
    .bind(change.status)
    .bind(change.submitted_at)
    .bind(change.updated_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn touch_nomination(conn: &mut PgConnection, id: Uuid) -> Result<DateTime<Utc>> {
    let updated_at = sqlx::query_scalar::<_, DateTime<Utc>>(
        "UPDATE nominations SET updated_at = now() WHERE id = $1 RETURNING updated_at",
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(updated_at)
}

// ============================================
// Panel reviews
// ============================================

/// One review per (nomination, member); a repeat submission overwrites it.
pub async fn upsert_review(
    conn: &mut PgConnection,
    nomination_id: Uuid,
    member_id: Uuid,
    score: i32,
    comments: Option<&str>,
) -> Result<PanelReview> {
    let row = sqlx::query_as::<_, PanelReview>(
        r#"
        INSERT INTO panel_reviews (id, nomination_id, panel_member_id, score, comments)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT ON CONSTRAINT uq_panel_reviews_member
        DO UPDATE SET score = EXCLUDED.score,
                      comments = EXCLUDED.comments,
                      updated_at = now()
        RETURNING id, nomination_id, panel_member_id, score, comments, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(nomination_id)
    .bind(member_id)
    .bind(score)
    .bind(comments)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn reviews_for(pool: &PgPool, nomination_id: Uuid) -> Result<Vec<PanelReview>> {
    let rows = sqlx::query_as::<_, PanelReview>(
        r#"
        SELECT id, nomination_id, panel_member_id, score, comments, created_at, updated_at
        FROM panel_reviews
        WHERE nomination_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(nomination_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[derive(Debug, FromRow)]
pub struct NominationScores {
    #[sqlx(flatten)]
    pub nomination: Nomination,
    pub scores: Vec<i32>,
}

/// Nominations of a cycle in the given statuses with every panel score attached.
pub async fn nominations_with_scores(
    pool: &PgPool,
    cycle_id: Uuid,
    statuses: &[NominationStatus],
) -> Result<Vec<NominationScores>> {
    let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    let rows = sqlx::query_as::<_, NominationScores>(
        r#"
        SELECT n.id, n.cycle_id, n.form_id, n.nominee_id, n.nominated_by_id,
               n.status, n.submitted_at, n.created_at, n.updated_at,
               COALESCE(ARRAY_AGG(r.score) FILTER (WHERE r.score IS NOT NULL), '{}') AS scores
        FROM nominations n
        LEFT JOIN panel_reviews r ON r.nomination_id = n.id
        WHERE n.cycle_id = $1
          AND n.status::text = ANY($2)
        GROUP BY n.id
        "#,
    )
    .bind(cycle_id)
    .bind(&statuses)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ============================================
// Awards
// ============================================

pub struct NewAward<'a> {
    pub cycle_id: Uuid,
    pub nomination_id: Uuid,
    pub winner_id: Uuid,
    pub award_type: Option<&'a str>,
    pub rank: Option<i32>,
    pub comment: Option<&'a str>,
}

pub async fn find_award_for_nomination(
    conn: &mut PgConnection,
    nomination_id: Uuid,
) -> Result<Option<Award>> {
    let row = sqlx::query_as::<_, Award>(&format!(
        "SELECT {AWARD_COLUMNS} FROM awards WHERE nomination_id = $1"
    ))
    .bind(nomination_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn insert_award(conn: &mut PgConnection, award: &NewAward<'_>) -> Result<Award> {
    let row = sqlx::query_as::<_, Award>(&format!(
        r#"
        INSERT INTO awards (id, cycle_id, nomination_id, winner_id, award_type, rank, comment)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {AWARD_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(award.cycle_id)
    .bind(award.nomination_id)
    .bind(award.winner_id)
    .bind(award.award_type)
    .bind(award.rank)
    .bind(award.comment)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn awards_for_cycle(pool: &PgPool, cycle_id: Uuid) -> Result<Vec<Award>> {
    let rows = sqlx::query_as::<_, Award>(&format!(
        r#"
        SELECT {AWARD_COLUMNS}
        FROM awards
        WHERE cycle_id = $1
        ORDER BY rank NULLS LAST, created_at
        "#
    ))
    .bind(cycle_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn lock_awards_for_cycle(conn: &mut PgConnection, cycle_id: Uuid) -> Result<Vec<Award>> {
    let rows = sqlx::query_as::<_, Award>(&format!(
        "SELECT {AWARD_COLUMNS} FROM awards WHERE cycle_id = $1 FOR UPDATE"
    ))
    .bind(cycle_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn stamp_awards(conn: &mut PgConnection, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE awards
        SET finalized_at = $2, updated_at = $2
        WHERE id = ANY($1) AND finalized_at IS NULL
        "#,
    )
    .bind(ids)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
