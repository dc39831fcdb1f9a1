//! Pass-through client for the hosted CRM tables.
//!
//! The store speaks the PostgREST dialect: one URL per table, filters as
//! `column=eq.value` query pairs and `Prefer: return=representation` to get
//! written rows back. Nothing is cached and nothing is retried.

use crate::config::CrmConfig;
use crate::errors::GatewayError;
use crate::models::{
    CatalogProduct, Category, CategoryInput, HistoryCategory, Lead, LeadHistory, LeadUpdate,
    NewHistoryEntry, NewScheduleEvent, Product, ProductInput, ProductListing, ScheduleEvent,
};
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

pub const LEADS_TABLE: &str = "leads";
pub const HISTORY_TABLE: &str = "lead_history";
pub const SCHEDULE_TABLE: &str = "schedule";
pub const PRODUCTS_TABLE: &str = "products";
pub const CATEGORIES_TABLE: &str = "crm_brands";

const JOINED_PRODUCT_SELECT: &str = "*,crm_brands(nome)";

#[derive(Debug, Clone)]
pub struct CrmGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CrmGateway {
    pub fn new(config: &CrmConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, GatewayError> {
        let response = self.request(Method::GET, table).query(query).send().await?;
        Self::handle_response(response).await
    }

    async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        first_row(table, Self::handle_response(response).await?)
    }

    async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        id: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        let filter = format!("eq.{id}");
        let response = self
            .request(Method::PATCH, table)
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows = Self::handle_response(response).await?;
        first_row(table, rows).map_err(|_| GatewayError::NotFound(format!("{table} '{id}'")))
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), GatewayError> {
        let filter = format!("eq.{id}");
        let response = self
            .request(Method::DELETE, table)
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await?;
        Err(GatewayError::Api {
            status: status.as_u16(),
            message: api_message(&body).unwrap_or(body),
        })
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, GatewayError> {
        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| GatewayError::InvalidResponse(err.to_string()))
    }

    // ========== Leads ==========

    pub async fn list_leads(&self) -> Result<Vec<Lead>, GatewayError> {
        self.select(LEADS_TABLE, &[("select", "*"), ("order", "created_at.desc")])
            .await
    }

    pub async fn get_lead(&self, id: &str) -> Result<Lead, GatewayError> {
        let filter = format!("eq.{id}");
        let rows: Vec<Lead> = self
            .select(LEADS_TABLE, &[("select", "*"), ("id", filter.as_str())])
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(format!("lead '{id}'")))
    }

    /// Newest entries first.
    pub async fn lead_history(&self, lead_id: &str) -> Result<Vec<LeadHistory>, GatewayError> {
        let filter = format!("eq.{lead_id}");
        self.select(
            HISTORY_TABLE,
            &[
                ("select", "*"),
                ("lead_id", filter.as_str()),
                ("order", "created_at.desc"),
            ],
        )
        .await
    }

    /// Patches the lead, then appends the history entries the change calls for.
    /// The requests are independent; a failure after the patch leaves the lead
    /// updated without its notes.
    pub async fn update_lead(
        &self,
        previous: &Lead,
        update: &LeadUpdate,
        note: Option<&str>,
    ) -> Result<Lead, GatewayError> {
        let lead: Lead = self.update(LEADS_TABLE, &previous.id, update).await?;

        for entry in history_for_update(previous, update, note) {
            self.append_history(&entry).await?;
        }

        info!(lead = %lead.id, stage = ?lead.stage, "lead updated");
        Ok(lead)
    }

    pub async fn append_history(&self, entry: &NewHistoryEntry) -> Result<LeadHistory, GatewayError> {
        self.insert(HISTORY_TABLE, entry).await
    }

    pub async fn schedule(
        &self,
        lead_id: &str,
        event: &NewScheduleEvent,
    ) -> Result<ScheduleEvent, GatewayError> {
        let mut body = serde_json::to_value(event)
            .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
        body["lead_id"] = json!(lead_id);
        let scheduled: ScheduleEvent = self.insert(SCHEDULE_TABLE, &body).await?;

        self.append_history(&schedule_history(lead_id, event)).await?;
        Ok(scheduled)
    }

    // ========== Products ==========

    /// Tries the category join first and falls back to plain rows when the
    /// relation is not exposed by the store.
    pub async fn list_products(&self) -> Result<ProductListing, GatewayError> {
        let joined = self
            .select::<CatalogProduct>(
                PRODUCTS_TABLE,
                &[("select", JOINED_PRODUCT_SELECT), ("order", "nome.asc")],
            )
            .await;

        match joined {
            Ok(products) => Ok(ProductListing::Joined(products)),
            Err(GatewayError::Api { status, message }) => {
                warn!(status, "joined product query failed, retrying without categories: {message}");
                let products = self
                    .select(PRODUCTS_TABLE, &[("select", "*"), ("order", "nome.asc")])
                    .await?;
                Ok(ProductListing::Unjoined(products))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, GatewayError> {
        self.insert(PRODUCTS_TABLE, input).await
    }

    pub async fn update_product(&self, id: &str, input: &ProductInput) -> Result<Product, GatewayError> {
        self.update(PRODUCTS_TABLE, id, input).await
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), GatewayError> {
        self.delete(PRODUCTS_TABLE, id).await
    }

    // ========== Categories ==========

    pub async fn list_categories(&self) -> Result<Vec<Category>, GatewayError> {
        self.select(CATEGORIES_TABLE, &[("select", "*"), ("order", "nome.asc")])
            .await
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, GatewayError> {
        self.insert(CATEGORIES_TABLE, input).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: &CategoryInput,
    ) -> Result<Category, GatewayError> {
        self.update(CATEGORIES_TABLE, id, input).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), GatewayError> {
        self.delete(CATEGORIES_TABLE, id).await
    }
}

fn first_row<T>(table: &str, rows: Vec<T>) -> Result<T, GatewayError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::InvalidResponse(format!("{table} returned no rows")))
}

/// PostgREST error bodies carry a `message` field; anything else is passed raw.
fn api_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("message")?.as_str().map(str::to_string)
}

/// History entries recorded for a lead edit: one system entry for a stage
/// transition and one user entry for a non-blank note.
pub fn history_for_update(
    previous: &Lead,
    update: &LeadUpdate,
    note: Option<&str>,
) -> Vec<NewHistoryEntry> {
    let mut entries = Vec::new();

    if let Some(stage) = update.stage.filter(|stage| *stage != previous.stage) {
        entries.push(NewHistoryEntry {
            lead_id: previous.id.clone(),
            category: HistoryCategory::Sistema,
            description: format!(
                "Etapa alterada de {} para {}",
                previous.stage.label(),
                stage.label()
            ),
        });
    }

    if let Some(note) = note.map(str::trim).filter(|note| !note.is_empty()) {
        entries.push(NewHistoryEntry {
            lead_id: previous.id.clone(),
            category: HistoryCategory::Usuario,
            description: note.to_string(),
        });
    }

    entries
}

pub fn schedule_history(lead_id: &str, event: &NewScheduleEvent) -> NewHistoryEntry {
    let date = NaiveDate::parse_from_str(&event.date, "%Y-%m-%d")
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| event.date.clone());

    let mut description = format!("{} agendado para {date} às {}", event.kind, event.time);
    if let Some(note) = event.note.as_deref().map(str::trim).filter(|note| !note.is_empty()) {
        description.push_str(&format!(" ({note})"));
    }

    NewHistoryEntry {
        lead_id: lead_id.to_string(),
        category: HistoryCategory::Agendamento,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScheduleStatus, Stage};

    fn lead(stage: Stage) -> Lead {
        Lead {
            id: "lead-1".into(),
            name: "Mercado Central".into(),
            email: None,
            phone: None,
            company: None,
            stage,
            value_min: None,
            value_max: None,
            return_date: None,
            return_time: None,
            remind_email: false,
            remind_whatsapp: false,
            created_at: None,
        }
    }

    #[test]
    fn stage_change_without_note_adds_one_system_entry() {
        let update = LeadUpdate {
            stage: Some(Stage::Proposta),
            ..LeadUpdate::default()
        };
        let entries = history_for_update(&lead(Stage::Novo), &update, None);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, HistoryCategory::Sistema);
        assert_eq!(entries[0].description, "Etapa alterada de Novo para Proposta");
        assert!(!entries.iter().any(|e| e.category == HistoryCategory::Usuario));
    }

    #[test]
    fn unchanged_stage_and_blank_note_add_nothing() {
        let update = LeadUpdate {
            stage: Some(Stage::Novo),
            name: Some("Mercado Central Ltda".into()),
            ..LeadUpdate::default()
        };
        assert!(history_for_update(&lead(Stage::Novo), &update, Some("   ")).is_empty());
    }

    #[test]
    fn note_adds_user_entry_after_system_entry() {
        let update = LeadUpdate {
            stage: Some(Stage::Ganho),
            ..LeadUpdate::default()
        };
        let entries =
            history_for_update(&lead(Stage::Negociacao), &update, Some(" fechou anual "));
        let categories: Vec<_> = entries.iter().map(|e| e.category).collect();
        assert_eq!(
            categories,
            vec![HistoryCategory::Sistema, HistoryCategory::Usuario]
        );
        assert_eq!(entries[1].description, "fechou anual");
    }

    #[test]
    fn schedule_history_describes_booking() {
        let event = NewScheduleEvent {
            kind: "Reunião".into(),
            date: "2025-05-09".into(),
            time: "14:30".into(),
            note: Some("levar proposta".into()),
            status: ScheduleStatus::Agendado,
        };
        let entry = schedule_history("lead-1", &event);
        assert_eq!(entry.category, HistoryCategory::Agendamento);
        assert_eq!(
            entry.description,
            "Reunião agendado para 09/05/2025 às 14:30 (levar proposta)"
        );
    }

    #[test]
    fn api_message_prefers_postgrest_message() {
        let body = r#"{"code":"PGRST200","message":"Could not find a relationship"}"#;
        assert_eq!(
            api_message(body).as_deref(),
            Some("Could not find a relationship")
        );
        assert_eq!(api_message("gateway timeout"), None);
    }
}
