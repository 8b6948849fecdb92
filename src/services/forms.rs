use crate::db::{self, NewField};
use crate::domain::eligibility;
use crate::domain::form_schema::CompiledForm;
use crate::domain::models::{FieldType, Form, FormField};
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDefinition {
    pub label: String,
    pub field_key: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub order_index: Option<i32>,
    pub options: Option<Value>,
    pub ui_schema: Option<Value>,
    pub validation_rules: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewForm {
    pub cycle_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Serialize)]
pub struct FormDetail {
    #[serde(flatten)]
    pub form: Form,
    pub fields: Vec<FormField>,
}

/// Checks a definition list before anything is stored and returns the
/// effective `order_index` of each field.
pub fn check_definitions(form_id: Uuid, defs: &[FieldDefinition]) -> AppResult<Vec<i32>> {
    if defs.is_empty() {
        return Err(AppError::validation("a form needs at least one field"));
    }

    let mut seen = HashSet::new();
    for def in defs {
        let key = def.field_key.trim();
        if key.is_empty() {
            return Err(AppError::validation("field_key must not be blank"));
        }
        if !seen.insert(key) {
            return Err(AppError::DuplicateKey(key.to_string()));
        }
    }

    let orders: Vec<i32> = defs
        .iter()
        .enumerate()
        .map(|(pos, def)| match def.order_index {
            Some(i) if i != 0 => i,
            _ => pos as i32 + 1,
        })
        .collect();

    // compile once so bad rules are rejected at definition time
    let drafts: Vec<FormField> = defs
        .iter()
        .zip(&orders)
        .map(|(def, order)| FormField {
            id: Uuid::nil(),
            form_id,
            label: def.label.clone(),
            field_key: def.field_key.trim().to_string(),
            field_type: def.field_type,
            is_required: def.is_required,
            order_index: *order,
            options: def.options.clone(),
            ui_schema: def.ui_schema.clone(),
            validation_rules: def.validation_rules.clone(),
        })
        .collect();
    CompiledForm::compile(&drafts)?;

    Ok(orders)
}

pub async fn create(pool: &PgPool, new: &NewForm) -> AppResult<FormDetail> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("form name must not be blank"));
    }
    let orders = check_definitions(Uuid::nil(), &new.fields)?;

    let mut tx = pool.begin().await?;
    db::find_cycle(&mut *tx, new.cycle_id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;
    if db::form_name_taken(&mut tx, new.cycle_id, name).await? {
        return Err(AppError::validation(format!(
            "a form named '{name}' already exists for this cycle"
        )));
    }

    let form = db::insert_form(&mut tx, new.cycle_id, name, new.description.as_deref()).await?;
    let mut fields = Vec::with_capacity(new.fields.len());
    for (def, order_index) in new.fields.iter().zip(orders) {
        let field = db::insert_field(
            &mut tx,
            form.id,
            &NewField {
                label: &def.label,
                field_key: def.field_key.trim(),
                field_type: def.field_type,
                is_required: def.is_required,
                order_index,
                options: def.options.as_ref(),
                ui_schema: def.ui_schema.as_ref(),
                validation_rules: def.validation_rules.as_ref(),
            },
        )
        .await?;
        fields.push(field);
    }
    tx.commit().await?;

    fields.sort_by_key(|f| f.order_index);
    tracing::info!(
        "Form {} created for cycle {} with {} fields",
        form.id,
        form.cycle_id,
        fields.len()
    );
    Ok(FormDetail { form, fields })
}

/// Field definitions in display order; inactive or unknown forms are not found.
pub async fn field_definitions(pool: &PgPool, form_id: Uuid) -> AppResult<FormDetail> {
    let form = db::find_form(pool, form_id)
        .await?
        .filter(|f| f.is_active)
        .ok_or(AppError::NotFound("form"))?;
    let fields = db::fields_for_form(pool, form.id).await?;
    Ok(FormDetail { form, fields })
}

/// Active form of a cycle that is accepting nominations.
pub async fn render_for_cycle(pool: &PgPool, cycle_id: Uuid) -> AppResult<FormDetail> {
    let cycle = db::find_cycle(pool, cycle_id)
        .await?
        .ok_or(AppError::NotFound("cycle"))?;
    eligibility::ensure_cycle_open(&cycle)?;
    let form = db::active_form_for_cycle(pool, cycle_id)
        .await?
        .ok_or(AppError::NotFound("form"))?;
    let fields = db::fields_for_form(pool, form.id).await?;
    Ok(FormDetail { form, fields })
}
