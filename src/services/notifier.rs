//! Operator notifications.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::info;

use crate::error::Result;

/// Something worth telling the operator about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    PriceDrop {
        product_name: String,
        current_price: f64,
        target_price: f64,
        url: String,
    },
    Test {
        product_name: String,
        current_price: f64,
        url: String,
    },
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn fmt_price(x: f64) -> String {
    if x.fract() == 0.0 {
        format!("₹{x:.0}")
    } else {
        format!("₹{x:.2}")
    }
}

impl Notice {
    /// Telegram-flavoured HTML body.
    pub fn render(&self) -> String {
        let now = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        match self {
            Notice::PriceDrop {
                product_name,
                current_price,
                target_price,
                url,
            } => format!(
                "🔔 <b>Price Alert!</b>\n\n\
                 Product: {}\n\
                 Current Price: {}\n\
                 Target Price: {}\n\
                 URL: {}\n\n\
                 Time: {now}",
                esc(product_name),
                fmt_price(*current_price),
                fmt_price(*target_price),
                esc(url),
            ),
            Notice::Test {
                product_name,
                current_price,
                url,
            } => format!(
                "🔔 <b>Test Alert</b>\n\n\
                 Product: {}\n\
                 Current Price: {}\n\
                 URL: {}\n\n\
                 Time: {now}",
                esc(product_name),
                fmt_price(*current_price),
                esc(url),
            ),
        }
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<()>;
}

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: i64) -> Self {
        Self {
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        self.bot
            .send_message(self.chat_id, notice.render())
            .parse_mode(ParseMode::Html)
            .await?;

        info!("telegram notification sent");
        Ok(())
    }
}

/// Used when no bot is configured: the message only goes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        info!(message = %notice.render(), "notification (telegram not configured)");
        Ok(())
    }
}
