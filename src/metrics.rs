use crate::models::DailyRecord;
use serde::Serialize;

pub const ZERO_MONEY: &str = "R$ 0,00";
pub const ZERO_RATE: &str = "0.0";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunnelTotals {
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

impl FunnelTotals {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a DailyRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut totals, record| {
            totals.leads = totals.leads.saturating_add(record.leads);
            totals.contacts = totals.contacts.saturating_add(record.contacts);
            totals.scheduled = totals.scheduled.saturating_add(record.scheduled);
            totals.attended = totals.attended.saturating_add(record.attended);
            totals.demos = totals.demos.saturating_add(record.demos);
            totals.proposals = totals.proposals.saturating_add(record.proposals);
            totals.approvals = totals.approvals.saturating_add(record.approvals);
            totals.sales = totals.sales.saturating_add(record.sales);
            totals.revenue += record.revenue;
            totals.investment += record.investment;
            totals
        })
    }
}

/// Percentages with one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelRates {
    pub conversion: String,
    pub scheduling: String,
    pub attendance: String,
    pub attendance_to_sale: String,
    pub demo_to_sale: String,
    pub proposal_to_sale: String,
    pub approval_to_sale: String,
    pub attendance_to_demo: String,
    pub demo_to_proposal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelCosts {
    pub per_lead: String,
    pub per_scheduled: String,
    pub per_attended: String,
    pub per_sale: String,
    pub average_ticket: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelMetrics {
    pub totals: FunnelTotals,
    pub rates: FunnelRates,
    pub costs: FunnelCosts,
}

impl FunnelMetrics {
    pub fn compute(records: &[DailyRecord]) -> Self {
        let totals = FunnelTotals::from_records(records);

        let rates = FunnelRates {
            conversion: rate(totals.sales, totals.leads),
            scheduling: rate(totals.scheduled, totals.leads),
            attendance: rate(totals.attended, totals.scheduled),
            attendance_to_sale: rate(totals.sales, totals.attended),
            demo_to_sale: rate(totals.sales, totals.demos),
            proposal_to_sale: rate(totals.sales, totals.proposals),
            approval_to_sale: rate(totals.sales, totals.approvals),
            attendance_to_demo: rate(totals.demos, totals.attended),
            demo_to_proposal: rate(totals.proposals, totals.demos),
        };

        let costs = FunnelCosts {
            per_lead: cost_per(totals.investment, totals.leads),
            per_scheduled: cost_per(totals.investment, totals.scheduled),
            per_attended: cost_per(totals.investment, totals.attended),
            per_sale: cost_per(totals.investment, totals.sales),
            average_ticket: cost_per(totals.revenue, totals.sales),
        };

        Self {
            totals,
            rates,
            costs,
        }
    }
}

pub fn rate(numerator: u64, denominator: u64) -> String {
    percent(numerator as f64, denominator as f64)
}

pub fn percent(numerator: f64, denominator: f64) -> String {
    if denominator == 0.0 {
        return ZERO_RATE.to_string();
    }
    format!("{:.1}", numerator / denominator * 100.0)
}

pub fn cost_per(amount: f64, count: u64) -> String {
    if count == 0 {
        return ZERO_MONEY.to_string();
    }
    format_brl(amount / count as f64)
}

pub fn goal_progress(revenue: f64, monthly_goal: f64) -> String {
    percent(revenue, monthly_goal)
}

/// Formats as Brazilian real: `R$ 1.234,56`.
pub fn format_brl(value: f64) -> String {
    if !value.is_finite() {
        return ZERO_MONEY.to_string();
    }
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();

    let digits = (cents / 100).to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{sign}R$ {grouped},{:02}", cents % 100)
}
