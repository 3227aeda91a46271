use super::ui;
use crate::core::config::AppConfig;
use crate::core::currency::{currency_symbol, locale_currency, normalize_currency_code};
use crate::core::rate::{COIN_UNIT, ExchangeRate, FIAT_EXPONENT, SECONDARY_COIN_CODE};
use crate::service::ExchangeRateService;
use anyhow::{Context, Result, anyhow, bail};
use comfy_table::{Cell, Table};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

const NO_RATES: &str = "No exchange rates available yet.";

/// Fiat per whole coin, trailing zeros dropped.
fn format_rate(rate: &ExchangeRate) -> String {
    rate.fiat_per_coin().round_dp(FIAT_EXPONENT).normalize().to_string()
}

fn format_fiat(fiat_units: i64, code: &str) -> String {
    let amount = Decimal::new(fiat_units, FIAT_EXPONENT).round_dp(4).normalize();
    format!("{} {}", currency_symbol(code), amount)
}

/// Parses a DOGM amount such as `12.5` into coin units.
pub fn parse_coin_amount(amount: &str) -> Result<i64> {
    let value = Decimal::from_str(amount.trim())
        .with_context(|| format!("Invalid amount: {amount}"))?;
    if value.is_sign_negative() {
        bail!("Amount must not be negative: {amount}");
    }
    let units = value
        .checked_mul(Decimal::from(COIN_UNIT))
        .ok_or_else(|| anyhow!("Amount too large: {amount}"))?;
    if units.fract() != Decimal::ZERO {
        bail!("Amount has more than 8 decimal places: {amount}");
    }
    units
        .to_i64()
        .ok_or_else(|| anyhow!("Amount too large: {amount}"))
}

fn rates_table(rows: &[ExchangeRate]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Symbol"),
        ui::header_cell(&format!("Per {SECONDARY_COIN_CODE}")),
        ui::header_cell("Source"),
    ]);
    for rate in rows {
        table.add_row(vec![
            Cell::new(&rate.currency_code),
            Cell::new(currency_symbol(&rate.currency_code)),
            ui::amount_cell(format_rate(rate)),
            Cell::new(&rate.source),
        ]);
    }
    table
}

fn print_no_rates(offline: bool) {
    let hint = if offline {
        " Run without --offline to fetch them."
    } else {
        " The rate feeds could not be reached."
    };
    println!(
        "{}{}",
        ui::style_text(NO_RATES, ui::StyleType::Error),
        ui::style_text(hint, ui::StyleType::Subtle)
    );
}

fn print_rows(rows: Option<Vec<ExchangeRate>>, offline: bool, empty_message: &str) {
    match rows {
        None => print_no_rates(offline),
        Some(rows) if rows.is_empty() => println!("{empty_message}"),
        Some(rows) => println!("{}", rates_table(&rows)),
    }
}

pub async fn list(service: &ExchangeRateService, offline: bool) -> Result<()> {
    let pb = (!offline).then(|| ui::new_spinner("Fetching exchange rates"));
    let rows = service.all(offline).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    print_rows(rows, offline, "No exchange rates in the cache.");
    Ok(())
}

pub async fn search(service: &ExchangeRateService, text: &str, offline: bool) -> Result<()> {
    let pb = (!offline).then(|| ui::new_spinner("Fetching exchange rates"));
    let rows = service.search(text, offline).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    print_rows(rows, offline, &format!("No currency matches \"{text}\"."));
    Ok(())
}

pub async fn get(service: &ExchangeRateService, codes: &[String], offline: bool) -> Result<()> {
    let pb = (!offline).then(|| ui::new_spinner("Fetching exchange rates"));
    let lookups = codes.iter().map(|code| async move {
        let rate = service.lookup(code, offline).await;
        (code.as_str(), rate)
    });
    let results = join_all(lookups).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if results.iter().all(|(_, rate)| rate.is_none()) {
        print_no_rates(offline);
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Requested"),
        ui::header_cell("Code"),
        ui::header_cell(&format!("Per {SECONDARY_COIN_CODE}")),
        ui::header_cell("Source"),
    ]);
    for (requested, rate) in &results {
        match rate {
            Some(rate) => {
                let code = if rate.currency_code == normalize_currency_code(requested) {
                    Cell::new(&rate.currency_code)
                } else {
                    Cell::new(format!("{} (fallback)", rate.currency_code))
                };
                table.add_row(vec![
                    Cell::new(requested),
                    code,
                    ui::amount_cell(format_rate(rate)),
                    Cell::new(&rate.source),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(requested),
                    Cell::new("-"),
                    ui::na_cell(true),
                    Cell::new(""),
                ]);
            }
        }
    }
    println!("{table}");
    Ok(())
}

pub async fn convert(
    service: &ExchangeRateService,
    amount: &str,
    code: Option<&str>,
    offline: bool,
) -> Result<()> {
    let coin_units = parse_coin_amount(amount)?;

    let pb = (!offline).then(|| ui::new_spinner("Fetching exchange rates"));
    let converted = service.convert(coin_units, code, offline).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let Some((rate, fiat_units)) = converted else {
        print_no_rates(offline);
        return Ok(());
    };
    println!(
        "{} {} = {}",
        amount.trim(),
        SECONDARY_COIN_CODE,
        ui::style_text(
            &format_fiat(fiat_units, &rate.currency_code),
            ui::StyleType::Value
        )
    );
    println!(
        "{}",
        ui::style_text(
            &format!(
                "1 {} = {} {} via {}",
                SECONDARY_COIN_CODE,
                format_rate(&rate),
                rate.currency_code,
                rate.source
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

pub async fn currency(
    service: &ExchangeRateService,
    config: &AppConfig,
    code: Option<&str>,
) -> Result<()> {
    if let Some(code) = code {
        let stored = service.set_user_currency(code).await?;
        println!(
            "Preferred currency set to {}",
            ui::style_text(&stored, ui::StyleType::Value)
        );
        return Ok(());
    }

    let preferred = service.user_currency().await;
    let locale = locale_currency();
    println!(
        "{} {}",
        ui::style_text("Preferred:", ui::StyleType::Label),
        preferred.as_deref().unwrap_or("not set")
    );
    println!(
        "{} {}",
        ui::style_text("Locale:", ui::StyleType::Label),
        locale.as_deref().unwrap_or("unknown")
    );
    println!(
        "{} {}",
        ui::style_text("Fallback:", ui::StyleType::Label),
        config.fallback_currency
    );
    Ok(())
}

pub async fn refresh(service: &ExchangeRateService) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates");
    let result = service.refresh_now().await;
    pb.finish_and_clear();

    let summary = result?;
    println!(
        "Updated {} exchange rates at {} (1 {} = {} BTC)",
        ui::style_text(&summary.entries.to_string(), ui::StyleType::Value),
        summary.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        SECONDARY_COIN_CODE,
        summary.ratio.value()
    );
    for skipped in &summary.skipped {
        println!(
            "{}",
            ui::style_text(
                &format!("Skipped {}: {}", skipped.pair, skipped.error),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(())
}

pub fn status(service: &ExchangeRateService, config: &AppConfig) -> Result<()> {
    let status = service.state();
    let last_updated = status.last_updated.map_or_else(
        || "never".to_string(),
        |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    println!(
        "{}",
        ui::style_text("Exchange rate cache", ui::StyleType::Title)
    );
    println!(
        "{} {:?}",
        ui::style_text("State:", ui::StyleType::Label),
        status.state
    );
    println!(
        "{} {}",
        ui::style_text("Entries:", ui::StyleType::Label),
        status.entries
    );
    println!(
        "{} {}",
        ui::style_text("Last updated:", ui::StyleType::Label),
        last_updated
    );
    println!(
        "{} {}s",
        ui::style_text("Refresh interval:", ui::StyleType::Label),
        config.refresh_interval_secs
    );
    Ok(())
}
