use crate::metrics::{rate, FunnelTotals};
use crate::models::DailyRecord;
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct DailyPoint {
    pub date: String,
    pub leads: u64,
    pub sales: u64,
    pub revenue: f64,
    pub investment: f64,
    pub conversion_rate: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub leads: u64,
    pub scheduled: u64,
    pub attended: u64,
    pub sales: u64,
    pub revenue: f64,
    pub investment: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub last_7_days: Vec<DailyPoint>,
    pub daily: Vec<DailyPoint>,
    pub monthly: Vec<MonthlyPoint>,
}

pub fn build_stats(records: &[DailyRecord]) -> StatsResponse {
    build_stats_at(Local::now().date_naive(), records)
}

pub fn build_stats_at(today: NaiveDate, records: &[DailyRecord]) -> StatsResponse {
    let mut by_day: BTreeMap<&str, Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        by_day.entry(record.date.as_str()).or_default().push(record);
    }

    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = (today - Duration::days(offset)).to_string();
        let day = by_day.get(date.as_str()).map(Vec::as_slice).unwrap_or_default();
        last_7_days.push(daily_point(date, day));
    }

    let daily = by_day
        .iter()
        .map(|(date, day)| daily_point(date.to_string(), day))
        .collect();

    let mut by_month: BTreeMap<&str, Vec<&DailyRecord>> = BTreeMap::new();
    for record in records {
        let month = record.date.get(..7).unwrap_or(record.date.as_str());
        by_month.entry(month).or_default().push(record);
    }

    let monthly = by_month
        .into_iter()
        .map(|(month, group)| {
            let totals = FunnelTotals::from_records(group);
            MonthlyPoint {
                month: month.to_string(),
                leads: totals.leads,
                scheduled: totals.scheduled,
                attended: totals.attended,
                sales: totals.sales,
                revenue: totals.revenue,
                investment: totals.investment,
            }
        })
        .collect();

    StatsResponse {
        last_7_days,
        daily,
        monthly,
    }
}

fn daily_point(date: String, records: &[&DailyRecord]) -> DailyPoint {
    let totals = FunnelTotals::from_records(records.iter().copied());
    DailyPoint {
        date,
        leads: totals.leads,
        sales: totals.sales,
        revenue: totals.revenue,
        investment: totals.investment,
        conversion_rate: rate(totals.sales, totals.leads),
    }
}
