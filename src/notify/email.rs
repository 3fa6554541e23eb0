use chrono::{DateTime, Utc};
use spendwatch_core::NotificationSender;
use spendwatch_domain::Category;
use tracing::{debug, info, warn};

use super::{ContentType, EmailMessage, MailTransport};

const SENT_AT_FORMAT: &str = "%B %d, %Y at %I:%M %p UTC";
const SIGNATURE: &str = "SpendWatch";

/// Formats `amount` with thousands separators and two decimals: `₹28,000.00`.
pub fn format_amount(symbol: &str, amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{:02}", cents % 100)
}

/// Composes budget and anomaly alerts and delivers them through `T`.
#[derive(Debug)]
pub struct EmailAlertSystem<T> {
    transport: T,
    sender_address: String,
    currency_symbol: String,
}

impl<T: MailTransport> EmailAlertSystem<T> {
    pub fn new(transport: T, sender_address: impl Into<String>) -> Self {
        Self {
            transport,
            sender_address: sender_address.into(),
            currency_symbol: "₹".into(),
        }
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn money(&self, amount: f64) -> String {
        format_amount(&self.currency_symbol, amount)
    }

    /// HTML budget alert, or `None` when `predicted_amount` is within the limit.
    pub fn compose_budget_alert(
        &self,
        recipient: &str,
        predicted_amount: f64,
        budget_limit: f64,
        sent_at: DateTime<Utc>,
    ) -> Option<EmailMessage> {
        if !(predicted_amount > budget_limit) {
            return None;
        }
        let overage = predicted_amount - budget_limit;
        let overage_percent = if budget_limit > 0.0 {
            overage / budget_limit * 100.0
        } else {
            100.0
        };
        let cell = r#"style="padding: 10px; border: 1px solid #ddd;""#;
        let alert_cell = r#"style="padding: 10px; border: 1px solid #ddd; color: #d9534f;""#;

        let body = format!(
            r#"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2 style="color: #d9534f;">Budget Alert</h2>
    <p>Your predicted spending for the next month exceeds your budget.</p>
    <table style="border-collapse: collapse; width: 100%; max-width: 400px;">
      <tr style="background-color: #f0f0f0;">
        <td {cell}><strong>Budget Limit</strong></td>
        <td {cell}>{limit}</td>
      </tr>
      <tr>
        <td {cell}><strong>Predicted Spending</strong></td>
        <td {alert_cell}>{predicted}</td>
      </tr>
      <tr style="background-color: #f0f0f0;">
        <td {cell}><strong>Overage</strong></td>
        <td {alert_cell}>{overage} ({overage_percent:.1}%)</td>
      </tr>
    </table>
    <p style="margin-top: 20px;">
      <strong>Action required:</strong> review upcoming expenses and cut back on discretionary spending.
    </p>
    <p style="color: #777; font-size: 12px; margin-top: 30px;">
      Sent on {sent}<br>
      {SIGNATURE}
    </p>
  </body>
</html>
"#,
            limit = self.money(budget_limit),
            predicted = self.money(predicted_amount),
            overage = self.money(overage),
            sent = sent_at.format(SENT_AT_FORMAT),
        );

        Some(EmailMessage::new(
            &self.sender_address,
            recipient,
            format!("Budget Alert: exceeding by {}", self.money(overage)),
            ContentType::Html,
            body,
            sent_at,
        ))
    }

    pub fn compose_anomaly_alert(
        &self,
        recipient: &str,
        amount: f64,
        category: Category,
        sent_at: DateTime<Utc>,
    ) -> EmailMessage {
        let body = format!(
            "Anomaly Alert!\n\n\
             An unusual expense was detected:\n\
             - Amount: {amount}\n\
             - Category: {category}\n\
             - Time: {sent}\n\n\
             This amount is well outside your typical spending pattern.\n\
             Please verify this transaction.\n\n\
             - {SIGNATURE}\n",
            amount = self.money(amount),
            sent = sent_at.format(SENT_AT_FORMAT),
        );
        EmailMessage::new(
            &self.sender_address,
            recipient,
            "Unusual Expense Detected",
            ContentType::Plain,
            body,
            sent_at,
        )
    }

    fn deliver(&self, message: &EmailMessage) -> bool {
        match self.transport.deliver(message) {
            Ok(()) => {
                info!(to = %message.to, subject = %message.subject, "alert delivered");
                true
            }
            Err(err) => {
                warn!(to = %message.to, error = %err, "alert delivery failed");
                false
            }
        }
    }
}

impl<T: MailTransport> NotificationSender for EmailAlertSystem<T> {
    fn send_budget_alert(
        &self,
        recipient: &str,
        predicted_amount: f64,
        budget_limit: f64,
    ) -> bool {
        match self.compose_budget_alert(recipient, predicted_amount, budget_limit, Utc::now()) {
            Some(message) => self.deliver(&message),
            None => {
                debug!(predicted_amount, budget_limit, "spending within budget; no alert");
                false
            }
        }
    }

    fn send_anomaly_alert(&self, recipient: &str, amount: f64, category: Category) -> bool {
        let message = self.compose_anomaly_alert(recipient, amount, category, Utc::now());
        self.deliver(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_grouping() {
        assert_eq!(format_amount("₹", 28_000.0), "₹28,000.00");
        assert_eq!(format_amount("$", 1_234_567.891), "$1,234,567.89");
        assert_eq!(format_amount("₹", 999.5), "₹999.50");
        assert_eq!(format_amount("₹", 0.0), "₹0.00");
        assert_eq!(format_amount("€", -3_000.0), "-€3,000.00");
    }
}
