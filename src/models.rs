use serde::{Deserialize, Serialize};

use crate::metrics::FunnelMetrics;
use crate::stats::StatsResponse;

/// One calendar day of funnel counts, owned by local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub id: String,
    pub date: String,
    pub leads: u64,
    pub contacts: u64,
    pub scheduled: u64,
    pub attended: u64,
    pub demos: u64,
    pub proposals: u64,
    pub approvals: u64,
    pub sales: u64,
    pub revenue: f64,
    pub investment: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordInput {
    pub date: Option<String>,
    pub leads: u64,
    pub contacts: u64,
    pub scheduled: u64,
    pub attended: u64,
    pub demos: u64,
    pub proposals: u64,
    pub approvals: u64,
    pub sales: u64,
    pub revenue: f64,
    pub investment: f64,
}

impl RecordInput {
    pub fn into_record(self, id: String, date: String) -> DailyRecord {
        DailyRecord {
            id,
            date,
            leads: self.leads,
            contacts: self.contacts,
            scheduled: self.scheduled,
            attended: self.attended,
            demos: self.demos,
            proposals: self.proposals,
            approvals: self.approvals,
            sales: self.sales,
            revenue: non_negative(self.revenue),
            investment: non_negative(self.investment),
        }
    }
}

/// Money fields are stored as finite, non-negative amounts.
pub fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub monthly_goal: f64,
    /// Data URI of the uploaded logo image.
    pub logo: Option<String>,
    pub sheet_url: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            monthly_goal: 100_000.0,
            logo: None,
            sheet_url: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Novo,
    Contato,
    Qualificado,
    Agendado,
    Proposta,
    Negociacao,
    Ganho,
    Perdido,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Novo => "Novo",
            Stage::Contato => "Contato",
            Stage::Qualificado => "Qualificado",
            Stage::Agendado => "Agendado",
            Stage::Proposta => "Proposta",
            Stage::Negociacao => "Negociação",
            Stage::Ganho => "Ganho",
            Stage::Perdido => "Perdido",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "empresa", default)]
    pub company: Option<String>,
    pub stage: Stage,
    #[serde(rename = "valor_min", default)]
    pub value_min: Option<f64>,
    #[serde(rename = "valor_max", default)]
    pub value_max: Option<f64>,
    #[serde(rename = "data_retorno", default)]
    pub return_date: Option<String>,
    #[serde(rename = "hora_retorno", default)]
    pub return_time: Option<String>,
    #[serde(rename = "lembrete_email", default)]
    pub remind_email: bool,
    #[serde(rename = "lembrete_whatsapp", default)]
    pub remind_whatsapp: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Mutable lead fields; absent fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "empresa", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(rename = "valor_min", default, skip_serializing_if = "Option::is_none")]
    pub value_min: Option<f64>,
    #[serde(rename = "valor_max", default, skip_serializing_if = "Option::is_none")]
    pub value_max: Option<f64>,
    #[serde(rename = "data_retorno", default, skip_serializing_if = "Option::is_none")]
    pub return_date: Option<String>,
    #[serde(rename = "hora_retorno", default, skip_serializing_if = "Option::is_none")]
    pub return_time: Option<String>,
    #[serde(rename = "lembrete_email", default, skip_serializing_if = "Option::is_none")]
    pub remind_email: Option<bool>,
    #[serde(rename = "lembrete_whatsapp", default, skip_serializing_if = "Option::is_none")]
    pub remind_whatsapp: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LeadEditRequest {
    #[serde(flatten)]
    pub changes: LeadUpdate,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryCategory {
    Sistema,
    Usuario,
    Agendamento,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadHistory {
    pub id: String,
    pub lead_id: String,
    #[serde(rename = "tipo")]
    pub category: HistoryCategory,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub lead_id: String,
    #[serde(rename = "tipo")]
    pub category: HistoryCategory,
    #[serde(rename = "descricao")]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct LeadDetail {
    pub lead: Lead,
    pub history: Vec<LeadHistory>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    #[default]
    Agendado,
    Realizado,
    Cancelado,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub id: String,
    pub lead_id: String,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "observacao", default)]
    pub note: Option<String>,
    #[serde(default)]
    pub status: ScheduleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScheduleEvent {
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "observacao", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub status: ScheduleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "preco", default)]
    pub price: f64,
    #[serde(rename = "ativo", default)]
    pub active: bool,
    #[serde(rename = "categoria", default)]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "preco", default)]
    pub price: f64,
    #[serde(rename = "ativo", default = "default_active")]
    pub active: bool,
    #[serde(rename = "categoria", default)]
    pub category_id: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryName {
    #[serde(rename = "nome")]
    pub name: String,
}

/// Product row returned by the joined `crm_brands(nome)` select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    #[serde(flatten)]
    pub product: Product,
    #[serde(rename = "crm_brands", default)]
    pub category: Option<CategoryName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "products", rename_all = "lowercase")]
pub enum ProductListing {
    Joined(Vec<CatalogProduct>),
    Unjoined(Vec<Product>),
}

impl ProductListing {
    pub fn len(&self) -> usize {
        match self {
            ProductListing::Joined(products) => products.len(),
            ProductListing::Unjoined(products) => products.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInput {
    #[serde(rename = "nome")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Gestor,
    Vendedor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Dashboard,
    Records,
    Crm,
    Products,
    Settings,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Dashboard,
        View::Records,
        View::Crm,
        View::Products,
        View::Settings,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

impl User {
    /// UI visibility only. Nothing here is enforced by the remote store.
    pub fn can_view(&self, view: View) -> bool {
        if !self.active {
            return false;
        }
        match self.role {
            Role::Admin => true,
            Role::Gestor => view != View::Settings,
            Role::Vendedor => matches!(view, View::Dashboard | View::Crm),
        }
    }

    pub fn visible_views(&self) -> Vec<View> {
        View::ALL
            .into_iter()
            .filter(|view| self.can_view(*view))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct FilterQuery {
    pub month: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ViewsQuery {
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub record_count: usize,
    pub metrics: FunnelMetrics,
    pub goal_progress: String,
    pub stats: StatsResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, active: bool) -> User {
        User {
            id: "u1".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            role,
            active,
        }
    }

    #[test]
    fn seller_sees_dashboard_and_crm_only() {
        let views = user(Role::Vendedor, true).visible_views();
        assert_eq!(views, vec![View::Dashboard, View::Crm]);
    }

    #[test]
    fn inactive_user_sees_nothing() {
        assert!(user(Role::Admin, false).visible_views().is_empty());
    }

    #[test]
    fn manager_cannot_open_settings() {
        let manager = user(Role::Gestor, true);
        assert!(manager.can_view(View::Products));
        assert!(!manager.can_view(View::Settings));
    }

    #[test]
    fn lead_update_only_serializes_present_fields() {
        let update = LeadUpdate {
            stage: Some(Stage::Proposta),
            ..LeadUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "stage": "proposta" }));
    }

    #[test]
    fn catalog_product_reads_joined_category() {
        let row = serde_json::json!({
            "id": "p1",
            "nome": "Plano Pro",
            "descricao": null,
            "preco": 199.9,
            "ativo": true,
            "categoria": "c1",
            "crm_brands": { "nome": "Software" }
        });
        let product: CatalogProduct = serde_json::from_value(row).unwrap();
        assert_eq!(product.product.name, "Plano Pro");
        assert_eq!(product.category.unwrap().name, "Software");
    }
}
