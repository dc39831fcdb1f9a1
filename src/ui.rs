use crate::metrics::{format_brl, goal_progress, FunnelMetrics};
use crate::models::AppSettings;

pub fn render_index(metrics: &FunnelMetrics, settings: &AppSettings) -> String {
    let totals = &metrics.totals;
    let logo = settings
        .logo
        .as_deref()
        .filter(|logo| logo.starts_with("data:image/"))
        .map(|logo| format!(r#"<img class="logo" src="{}" alt="logo" />"#, escape(logo)))
        .unwrap_or_default();

    INDEX_HTML
        .replace("{{LOGO}}", &logo)
        .replace("{{LEADS}}", &totals.leads.to_string())
        .replace("{{SCHEDULED}}", &totals.scheduled.to_string())
        .replace("{{ATTENDED}}", &totals.attended.to_string())
        .replace("{{SALES}}", &totals.sales.to_string())
        .replace("{{REVENUE}}", &format_brl(totals.revenue))
        .replace("{{INVESTMENT}}", &format_brl(totals.investment))
        .replace("{{CONVERSION}}", &metrics.rates.conversion)
        .replace("{{SCHEDULING}}", &metrics.rates.scheduling)
        .replace("{{ATTENDANCE}}", &metrics.rates.attendance)
        .replace("{{CPL}}", &metrics.costs.per_lead)
        .replace("{{CAC}}", &metrics.costs.per_sale)
        .replace("{{GOAL}}", &format_brl(settings.monthly_goal))
        .replace(
            "{{GOAL_PROGRESS}}",
            &goal_progress(totals.revenue, settings.monthly_goal),
        )
}

pub fn render_failure() -> String {
    FAILURE_HTML.to_string()
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Painel de Vendas</title>
  <style>
    body {
      margin: 0;
      font-family: system-ui, sans-serif;
      background: #f4f6fb;
      color: #1d2433;
    }

    header {
      display: flex;
      align-items: center;
      gap: 16px;
      padding: 20px 32px;
      background: #1d2433;
      color: #fff;
    }

    .logo {
      height: 40px;
    }

    main {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
      padding: 32px;
    }

    .kpi {
      background: #fff;
      border-radius: 12px;
      padding: 18px;
      box-shadow: 0 6px 18px rgba(29, 36, 51, 0.08);
    }

    .kpi span {
      display: block;
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.06em;
      color: #5b6478;
    }

    .kpi strong {
      font-size: 1.6rem;
    }
  </style>
</head>
<body>
  <header>
    {{LOGO}}
    <h1>Painel de Vendas</h1>
  </header>
  <main>
    <div class="kpi"><span>Leads</span><strong>{{LEADS}}</strong></div>
    <div class="kpi"><span>Agendados</span><strong>{{SCHEDULED}}</strong></div>
    <div class="kpi"><span>Comparecimentos</span><strong>{{ATTENDED}}</strong></div>
    <div class="kpi"><span>Vendas</span><strong>{{SALES}}</strong></div>
    <div class="kpi"><span>Conversão</span><strong>{{CONVERSION}}%</strong></div>
    <div class="kpi"><span>Taxa de agendamento</span><strong>{{SCHEDULING}}%</strong></div>
    <div class="kpi"><span>Comparecimento</span><strong>{{ATTENDANCE}}%</strong></div>
    <div class="kpi"><span>Faturamento</span><strong>{{REVENUE}}</strong></div>
    <div class="kpi"><span>Investimento</span><strong>{{INVESTMENT}}</strong></div>
    <div class="kpi"><span>Custo por lead</span><strong>{{CPL}}</strong></div>
    <div class="kpi"><span>Custo por venda</span><strong>{{CAC}}</strong></div>
    <div class="kpi"><span>Meta {{GOAL}}</span><strong>{{GOAL_PROGRESS}}%</strong></div>
  </main>
</body>
</html>
"#;

const FAILURE_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <title>Algo deu errado</title>
  <style>
    body {
      margin: 0;
      min-height: 100vh;
      display: grid;
      place-items: center;
      font-family: system-ui, sans-serif;
      background: #fdf2f2;
      color: #5c1a1a;
    }

    button {
      padding: 10px 18px;
      border: 0;
      border-radius: 8px;
      background: #c0392b;
      color: #fff;
      cursor: pointer;
    }
  </style>
</head>
<body>
  <div>
    <h1>Algo deu errado</h1>
    <p>O painel encontrou um erro inesperado.</p>
    <form method="post" action="/api/reset">
      <button type="submit">Limpar dados locais e recarregar</button>
    </form>
  </div>
</body>
</html>
"#;
