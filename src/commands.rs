//! Operator commands. Each one prints to a [`Console`] and returns an exit code.

use std::io::{self, Stderr, Stdout, Write};
use std::process::ExitCode;

use calisero_core::validation::{phone_e164, sender_id};
use calisero_core::{CaliseroError, Message, Verification};
use calisero_webhook::{sign, signature_matches};

use crate::gateway::SmsGateway;
use crate::params::{SendSmsParams, VerificationCheckParams, VerificationParams};

const MISSING: &str = "N/A";

/// Output and error streams of a command.
pub struct Console<O = Stdout, E = Stderr> {
    pub out: O,
    pub err: E,
}

impl Console {
    pub fn stdio() -> Self {
        Self {
            out: io::stdout(),
            err: io::stderr(),
        }
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.out, "{}", text.as_ref())
    }

    pub fn error(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.err, "{}", text.as_ref())
    }

    /// Boxed table with a header row.
    pub fn table(&mut self, headers: [&str; 2], rows: &[(String, String)]) -> io::Result<()> {
        let width = |i: usize| {
            rows.iter()
                .map(|row| if i == 0 { &row.0 } else { &row.1 })
                .map(|cell| cell.chars().count())
                .chain([headers[i].chars().count()])
                .max()
                .unwrap_or_default()
        };
        let (w0, w1) = (width(0), width(1));
        let border = format!("+{}+{}+", "-".repeat(w0 + 2), "-".repeat(w1 + 2));
        let row = |a: &str, b: &str| {
            format!(
                "| {}{} | {}{} |",
                a,
                " ".repeat(w0 - a.chars().count()),
                b,
                " ".repeat(w1 - b.chars().count())
            )
        };

        writeln!(self.out, "{}", border)?;
        writeln!(self.out, "{}", row(headers[0], headers[1]))?;
        writeln!(self.out, "{}", border)?;
        for (a, b) in rows {
            writeln!(self.out, "{}", row(a, b))?;
        }
        writeln!(self.out, "{}", border)
    }

    /// One fixed message per error kind.
    pub fn report(&mut self, err: &CaliseroError, not_found: &str) -> io::Result<()> {
        match err {
            CaliseroError::Validation { message, errors } => {
                self.error(format!("✗ API validation error: {}", message))?;
                if !errors.is_empty() {
                    let rows: Vec<_> = errors
                        .iter()
                        .map(|(field, messages)| (field.clone(), messages.join("; ")))
                        .collect();
                    self.table(["Field", "Errors"], &rows)?;
                }
                Ok(())
            }
            CaliseroError::RateLimited {
                message,
                retry_after,
            } => {
                self.error(format!("✗ Rate limited: {}", message))?;
                let after = retry_after.map_or_else(|| "unknown".to_string(), |s| s.to_string());
                self.line(format!("Retry after: {}s", after))
            }
            CaliseroError::Unauthorized(message) | CaliseroError::Forbidden(message) => {
                self.error(format!("✗ Auth/permission error: {}", message))
            }
            CaliseroError::NotFound(message) => self.error(format!("✗ {}: {}", not_found, message)),
            CaliseroError::Server { message, .. } => {
                self.error(format!("✗ Server error: {}", message))
            }
            CaliseroError::Api {
                status,
                message,
                request_id,
            } => self.error(format!(
                "✗ API error: {} (status: {}, request: {})",
                message,
                status,
                request_id.as_deref().unwrap_or("unknown")
            )),
            other => self.error(format!("✗ Unexpected failure: {}", other)),
        }
    }
}

fn or_missing(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| MISSING.to_string())
}

fn message_rows(message: &Message) -> Vec<(String, String)> {
    [
        ("ID", message.id.clone()),
        ("Recipient", message.recipient.clone()),
        ("Sender", or_missing(&message.sender)),
        ("Body", message.body.clone()),
        ("Parts", message.parts.to_string()),
        ("Status", message.status.clone()),
        ("Created At", or_missing(&message.created_at)),
        ("Scheduled At", or_missing(&message.scheduled_at)),
        ("Sent At", or_missing(&message.sent_at)),
        ("Delivered At", or_missing(&message.delivered_at)),
        ("Callback URL", or_missing(&message.callback_url)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn verification_rows(verification: &Verification) -> Vec<(String, String)> {
    [
        ("ID", verification.id.clone()),
        ("Phone", verification.phone.clone()),
        ("Status", verification.status.clone()),
        ("Brand", or_missing(&verification.brand)),
        ("Template", or_missing(&verification.template)),
        ("Created At", or_missing(&verification.created_at)),
        ("Expires At", or_missing(&verification.expires_at)),
        ("Attempts", verification.attempts.to_string()),
        (
            "Expired",
            if verification.expired { "Yes" } else { "No" }.to_string(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// `sms test <to> [--from] [--text]`
pub async fn send_test_sms<O: Write, E: Write>(
    console: &mut Console<O, E>,
    gateway: &dyn SmsGateway,
    to: &str,
    from: Option<&str>,
    text: &str,
) -> io::Result<ExitCode> {
    if let Err(rule) = phone_e164(to) {
        console.error(format!("✗ {}", rule.message("to")))?;
        return Ok(ExitCode::FAILURE);
    }
    if let Some(Err(rule)) = from.map(sender_id) {
        console.error(format!("✗ {}", rule.message("from")))?;
        return Ok(ExitCode::FAILURE);
    }

    let mut params = SendSmsParams::new(to, text);
    params.from = from.map(str::to_string);

    match gateway.send_sms(params).await {
        Ok(response) => {
            console.line("SMS sent successfully!")?;
            console.line(format!("Message ID: {}", response.data().id))?;
            console.line(format!("To: {}", to))?;
            console.line(format!("Text: {}", text))?;
            if let Some(from) = from {
                console.line(format!("From: {}", from))?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            console.report(&err, "Resource not found")?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `sms status <id>`
pub async fn sms_status<O: Write, E: Write>(
    console: &mut Console<O, E>,
    gateway: &dyn SmsGateway,
    id: &str,
) -> io::Result<ExitCode> {
    let id = id.trim();
    if id.is_empty() {
        console.error("✗ Message id must not be empty")?;
        return Ok(ExitCode::FAILURE);
    }

    console.line(format!("Retrieving SMS status for ID: {}...", id))?;
    match gateway.get_message_status(id).await {
        Ok(response) => {
            let message = response.data();
            console.line("✓ SMS retrieved successfully")?;
            console.table(["Property", "Value"], &message_rows(message))?;
            console.line(format!("Status: {}", message.status))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            console.report(&err, "Message not found")?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `verification send <to> [--brand] [--template] [--expires-in]`
pub async fn send_verification<O: Write, E: Write>(
    console: &mut Console<O, E>,
    gateway: &dyn SmsGateway,
    params: VerificationParams,
) -> io::Result<ExitCode> {
    console.line(format!("Sending verification code to {}...", params.to))?;
    match gateway.send_verification(params).await {
        Ok(response) => {
            console.line("✓ Verification code sent")?;
            console.table(["Property", "Value"], &verification_rows(response.data()))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            console.report(&err, "Resource not found")?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `verification check <to> <code>`; succeeds only for a verified code.
pub async fn check_verification<O: Write, E: Write>(
    console: &mut Console<O, E>,
    gateway: &dyn SmsGateway,
    params: VerificationCheckParams,
) -> io::Result<ExitCode> {
    console.line(format!("Checking verification code for {}...", params.to))?;
    match gateway.check_verification(params).await {
        Ok(response) if response.data().is_verified() => {
            let verification = response.data();
            console.line("✓ Verification code is valid!")?;
            console.table(
                ["Property", "Value"],
                &[
                    ("To".to_string(), verification.phone.clone()),
                    ("Valid".to_string(), "Yes".to_string()),
                    ("Status".to_string(), verification.status.clone()),
                ],
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(_) => {
            console.error("✗ Verification code is invalid or expired")?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            console.error(format!("✗ Failed to check verification code: {}", err))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// `webhook verify <signature> [--payload]`, checked locally against the secret.
pub fn verify_webhook<O: Write, E: Write>(
    console: &mut Console<O, E>,
    secret: Option<&str>,
    signature: &str,
    payload: &str,
) -> io::Result<ExitCode> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        console.error(
            "Webhook secret not configured. Set CALISERO_WEBHOOK__SECRET in your environment.",
        )?;
        return Ok(ExitCode::FAILURE);
    };

    let expected = sign(secret, payload.as_bytes());
    let valid = signature_matches(secret, payload.as_bytes(), signature);
    if valid {
        console.line("✓ Webhook signature is valid")?;
    } else {
        console.error("✗ Webhook signature is invalid")?;
    }
    console.line(format!("Expected: {}", expected))?;
    console.line(format!("Received: {}", signature))?;

    Ok(if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// `balance`
pub async fn balance<O: Write, E: Write>(
    console: &mut Console<O, E>,
    gateway: &dyn SmsGateway,
) -> io::Result<ExitCode> {
    match gateway.get_balance().await {
        Ok(credit) => {
            console.line(format!("Remaining credit: {}", credit))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            console.report(&err, "Account not found")?;
            Ok(ExitCode::FAILURE)
        }
    }
}
