//! Telegram Bot API round summaries.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::TelegramConfig;
use crate::hedge::{ReportSink, RoundReport};

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Posts a text summary of each round to a Telegram chat.
pub struct TelegramReporter {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
    enabled: bool,
}

impl TelegramReporter {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            enabled: config.enabled,
        })
    }

    /// Sending is skipped unless enabled with both token and chat id.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Telegram request failed")?;

        if response.status().is_success() {
            info!("Telegram round report sent");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "Telegram API rejected message");
            Err(anyhow::anyhow!("Telegram API error: {}", status))
        }
    }
}

#[async_trait]
impl ReportSink for TelegramReporter {
    async fn send_report(&self, report: &RoundReport) -> Result<()> {
        if !self.is_active() {
            debug!(round = report.round, "Telegram disabled, report not sent");
            return Ok(());
        }
        self.send_message(&format_report(report)).await
    }
}

fn signed(value: Decimal) -> String {
    let value = value.round_dp(4);
    if value.is_sign_negative() && !value.is_zero() {
        format!("{:.4}", value)
    } else {
        format!("+{:.4}", value.abs())
    }
}

/// Human readable round summary.
pub fn format_report(report: &RoundReport) -> String {
    format!(
        "🔹 {} round {}/{} finished ({} first)\n\
         ━━━━━━━━━━━━━━\n\
         💰 Maker PnL: {}\n\
         💰 Taker PnL: {}\n\
         --------------------------\n\
         📉 Round wear: {}\n\
         📊 Cumulative wear: {}\n\
         📈 Total volume: {:.2} U",
        report.ticker,
        report.round,
        report.iterations,
        report.direction,
        signed(report.maker_pnl),
        signed(report.taker_pnl),
        signed(report.round_wear),
        signed(report.cumulative_wear),
        report.total_volume.round_dp(2),
    )
}
