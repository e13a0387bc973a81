use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use pipeline_core::{
    BalanceSheet, CashFlowStatement, CompanyProfile, FinancialRatios, FundamentalsProvider,
    IncomeStatement, PipelineError, StatementBundle,
};
use serde_json::Value;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Fundamentals adapter for Alpha Vantage: company overview, annual
/// statements and key ratios.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: reqwest::Client,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: crate::http_client(),
        }
    }

    async fn get_json(&self, function: &str, symbol: &str) -> Result<Value, PipelineError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", function),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::Provider(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let payload: Value = response.json().await?;

        // Alpha Vantage reports throttling and bad requests inside a 200 body
        if payload.get("Note").is_some() {
            return Err(PipelineError::Provider(
                "Alpha Vantage request limit reached".to_string(),
            ));
        }
        if let Some(message) = payload.get("Error Message").and_then(Value::as_str) {
            return Err(PipelineError::Provider(message.to_string()));
        }

        Ok(payload)
    }

    /// Most recent annual report from a statement payload, if any.
    fn latest_annual(payload: &Value) -> Option<(&Value, NaiveDate)> {
        let report = payload.get("annualReports")?.as_array()?.first()?;
        let date = report
            .get("fiscalDateEnding")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())?;
        Some((report, date))
    }
}

#[async_trait]
impl FundamentalsProvider for AlphaVantageClient {
    fn supports_symbol(&self, symbol: &str) -> bool {
        // Exchange-suffixed listings (PETR4.SA, 005930.KS, ...) are not served
        !symbol.contains('.')
    }

    async fn fetch_company_overview(
        &self,
        symbol: &str,
    ) -> Result<Option<CompanyProfile>, PipelineError> {
        tracing::info!("Fetching company overview for {}", symbol);
        let payload = self.get_json("OVERVIEW", symbol).await?;

        if payload.get("Symbol").is_none() {
            tracing::warn!("No overview data for {}", symbol);
            return Ok(None);
        }

        Ok(Some(CompanyProfile {
            symbol: text(&payload, "Symbol"),
            company_name: text(&payload, "Name"),
            sector: text(&payload, "Sector"),
            industry: text(&payload, "Industry"),
            description: text(&payload, "Description"),
            website: text(&payload, "OfficialSite"),
            market_cap: number(&payload, "MarketCapitalization"),
            employees: integer(&payload, "FullTimeEmployees"),
            country: text(&payload, "Country"),
            currency: text(&payload, "Currency"),
            exchange: text(&payload, "Exchange"),
            updated_at: Utc::now(),
        }))
    }

    async fn fetch_statements(&self, symbol: &str) -> Result<StatementBundle, PipelineError> {
        let mut bundle = StatementBundle::default();

        let income = self.get_json("INCOME_STATEMENT", symbol).await?;
        if let Some((report, date)) = Self::latest_annual(&income) {
            bundle.income = Some(IncomeStatement {
                symbol: symbol.to_string(),
                date,
                period: "FY".to_string(),
                revenue: number(report, "totalRevenue"),
                cost_of_revenue: number(report, "costOfRevenue"),
                gross_profit: number(report, "grossProfit"),
                operating_expenses: number(report, "operatingExpenses"),
                operating_income: number(report, "operatingIncome"),
                net_income: number(report, "netIncome"),
                eps: number(report, "reportedEPS"),
                ebitda: number(report, "ebitda"),
            });
        }

        let balance = self.get_json("BALANCE_SHEET", symbol).await?;
        if let Some((report, date)) = Self::latest_annual(&balance) {
            let current_assets = number(report, "totalCurrentAssets");
            let current_liabilities = number(report, "totalCurrentLiabilities");
            bundle.balance = Some(BalanceSheet {
                symbol: symbol.to_string(),
                date,
                period: "FY".to_string(),
                total_assets: number(report, "totalAssets"),
                total_liabilities: number(report, "totalLiabilities"),
                total_equity: number(report, "totalShareholderEquity"),
                cash: number(report, "cashAndCashEquivalentsAtCarryingValue"),
                total_debt: number(report, "shortLongTermDebtTotal"),
                working_capital: current_assets - current_liabilities,
            });
        }

        let cash_flow = self.get_json("CASH_FLOW", symbol).await?;
        if let Some((report, date)) = Self::latest_annual(&cash_flow) {
            let operating = number(report, "operatingCashflow");
            let capex = number(report, "capitalExpenditures");
            bundle.cash_flow = Some(CashFlowStatement {
                symbol: symbol.to_string(),
                date,
                period: "FY".to_string(),
                operating_cash_flow: operating,
                investing_cash_flow: number(report, "cashflowFromInvestment"),
                financing_cash_flow: number(report, "cashflowFromFinancing"),
                free_cash_flow: operating - capex,
                capex,
            });
        }

        Ok(bundle)
    }

    async fn fetch_key_ratios(
        &self,
        symbol: &str,
    ) -> Result<Option<FinancialRatios>, PipelineError> {
        let payload = self.get_json("OVERVIEW", symbol).await?;

        if payload.get("Symbol").is_none() {
            return Ok(None);
        }

        let revenue = number(&payload, "RevenueTTM");
        let gross_profit = number(&payload, "GrossProfitTTM");
        let gross_margin = if revenue > 0.0 {
            gross_profit / revenue * 100.0
        } else {
            0.0
        };

        Ok(Some(FinancialRatios {
            symbol: symbol.to_string(),
            date: Utc::now().date_naive(),
            period: "TTM".to_string(),
            pe_ratio: number(&payload, "PERatio"),
            pb_ratio: number(&payload, "PriceToBookRatio"),
            ps_ratio: number(&payload, "PriceToSalesRatioTTM"),
            // Alpha Vantage reports returns and margins as fractions
            roe: number(&payload, "ReturnOnEquityTTM") * 100.0,
            roa: number(&payload, "ReturnOnAssetsTTM") * 100.0,
            roi: 0.0,            // not exposed by the overview payload
            debt_to_equity: 0.0, // not exposed by the overview payload
            current_ratio: 0.0,  // not exposed by the overview payload
            quick_ratio: 0.0,    // not exposed by the overview payload
            gross_margin,
            operating_margin: number(&payload, "OperatingMarginTTM") * 100.0,
            net_margin: number(&payload, "ProfitMargin") * 100.0,
        }))
    }
}

/// Alpha Vantage serializes every value as a string; "None" and missing keys
/// both read as the zero value.
fn number(value: &Value, key: &str) -> f64 {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0)
}

fn integer(value: &Value, key: &str) -> i64 {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
