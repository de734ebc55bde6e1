//! Transactional email: restaurant applications and financial reports.
//!
//! Uses SMTP via lettre with Askama HTML and plain-text templates. Outside
//! production nothing is sent; the message is logged instead.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use neyisek_core::{Email, Lira};

use crate::config::{EmailConfig, Environment};
use crate::error::AppError;

#[derive(Template)]
#[template(path = "email/restaurant_application.html")]
struct RestaurantApplicationHtml<'a> {
    application: &'a RestaurantApplication,
}

#[derive(Template)]
#[template(path = "email/restaurant_application.txt")]
struct RestaurantApplicationText<'a> {
    application: &'a RestaurantApplication,
}

#[derive(Template)]
#[template(path = "email/financial_report.html")]
struct FinancialReportHtml<'a> {
    report: &'a FinancialReport,
}

#[derive(Template)]
#[template(path = "email/financial_report.txt")]
struct FinancialReportText<'a> {
    report: &'a FinancialReport,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Production without SMTP credentials.
    #[error("SMTP credentials not configured")]
    NotConfigured,
}

/// What happened to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the SMTP relay.
    Sent,
    /// Logged only (non-production).
    Logged,
}

// =============================================================================
// Requests
// =============================================================================

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Eksik alan: {field}")))
}

fn valid_email(value: Option<String>) -> Result<Email, AppError> {
    let raw = required(value, "email")?;
    Email::parse(&raw).map_err(|_| AppError::BadRequest("Geçersiz e-posta adresi".to_string()))
}

/// Body of `POST /api/email/restaurant-application`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantApplicationRequest {
    pub restaurant_name: Option<String>,
    pub owner_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cuisine_type: Option<String>,
    pub message: Option<String>,
}

/// A restaurant's request to join the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestaurantApplication {
    pub restaurant_name: String,
    pub owner_name: String,
    pub email: Email,
    pub phone: String,
    pub address: Option<String>,
    pub cuisine_type: Option<String>,
    pub message: Option<String>,
}

impl RestaurantApplicationRequest {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first missing field.
    pub fn validate(self) -> Result<RestaurantApplication, AppError> {
        let optional = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(RestaurantApplication {
            restaurant_name: required(self.restaurant_name, "restaurantName")?,
            owner_name: required(self.owner_name, "ownerName")?,
            email: valid_email(self.email)?,
            phone: required(self.phone, "phone")?,
            address: optional(self.address),
            cuisine_type: optional(self.cuisine_type),
            message: optional(self.message),
        })
    }
}

/// Body of `POST /api/email/financial-report`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialReportRequest {
    pub restaurant_name: Option<String>,
    pub email: Option<String>,
    pub period: Option<String>,
    pub total_orders: Option<u32>,
    pub total_revenue: Option<Lira>,
    pub commission: Option<Lira>,
    pub net_amount: Option<Lira>,
}

/// A periodic earnings statement for one restaurant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialReport {
    pub restaurant_name: String,
    pub email: Email,
    pub period: String,
    pub total_orders: u32,
    pub total_revenue: Lira,
    pub commission: Lira,
    pub net_amount: Lira,
}

impl FinancialReportRequest {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming the first missing field.
    pub fn validate(self) -> Result<FinancialReport, AppError> {
        let missing = |field: &str| AppError::BadRequest(format!("Eksik alan: {field}"));
        Ok(FinancialReport {
            restaurant_name: required(self.restaurant_name, "restaurantName")?,
            email: valid_email(self.email)?,
            period: required(self.period, "period")?,
            total_orders: self.total_orders.ok_or_else(|| missing("totalOrders"))?,
            total_revenue: self.total_revenue.ok_or_else(|| missing("totalRevenue"))?,
            commission: self.commission.ok_or_else(|| missing("commission"))?,
            net_amount: self.net_amount.ok_or_else(|| missing("netAmount"))?,
        })
    }
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
enum Transport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Production without credentials; every send fails.
    Missing,
    Log,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    transport: Transport,
    from_address: String,
    admin_address: String,
}

impl EmailService {
    /// Create the email service.
    ///
    /// Outside production the service only logs messages.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Smtp` if the relay cannot be configured.
    pub fn new(config: &EmailConfig, environment: Environment) -> Result<Self, EmailError> {
        let transport = if !environment.is_production() {
            Transport::Log
        } else if let (Some(username), Some(password)) = (&config.username, &config.password) {
            let credentials =
                Credentials::new(username.clone(), password.expose_secret().to_string());
            let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port)
                .credentials(credentials)
                .build();
            Transport::Smtp(mailer)
        } else {
            tracing::warn!("EMAIL_USER/EMAIL_PASSWORD not set; email sending will fail");
            Transport::Missing
        };

        Ok(Self {
            transport,
            from_address: config
                .username
                .clone()
                .unwrap_or_else(|| config.admin_address.clone()),
            admin_address: config.admin_address.clone(),
        })
    }

    /// Forward a restaurant application to the platform admins.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, application), fields(restaurant = %application.restaurant_name))]
    pub async fn send_restaurant_application(
        &self,
        application: &RestaurantApplication,
    ) -> Result<Delivery, EmailError> {
        let html = RestaurantApplicationHtml { application }.render()?;
        let text = RestaurantApplicationText { application }.render()?;
        let subject = format!("Yeni Restoran Başvurusu: {}", application.restaurant_name);

        self.send_multipart_email(&self.admin_address, &subject, &text, &html)
            .await
    }

    /// Send a financial report to the restaurant.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    #[instrument(skip(self, report), fields(restaurant = %report.restaurant_name, period = %report.period))]
    pub async fn send_financial_report(
        &self,
        report: &FinancialReport,
    ) -> Result<Delivery, EmailError> {
        let html = FinancialReportHtml { report }.render()?;
        let text = FinancialReportText { report }.render()?;
        let subject = format!("NeYisek.com Finansal Rapor - {}", report.period);

        self.send_multipart_email(report.email.as_str(), &subject, &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<Delivery, EmailError> {
        let mailer = match &self.transport {
            Transport::Smtp(mailer) => mailer,
            Transport::Missing => return Err(EmailError::NotConfigured),
            Transport::Log => {
                tracing::info!(to = %to, subject = %subject, body = %text_body, "Email not sent outside production");
                return Ok(Delivery::Logged);
            }
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: None,
            password: None,
            admin_address: "admin@neyisek.com".to_string(),
        }
    }

    fn application() -> RestaurantApplication {
        RestaurantApplicationRequest {
            restaurant_name: Some("Köfteci Ramiz".to_string()),
            owner_name: Some("Ramiz Usta".to_string()),
            email: Some("ramiz@example.com".to_string()),
            phone: Some("05321234567".to_string()),
            cuisine_type: Some("Köfte".to_string()),
            ..RestaurantApplicationRequest::default()
        }
        .validate()
        .expect("valid")
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = RestaurantApplicationRequest {
            restaurant_name: Some("Köfteci".to_string()),
            ..RestaurantApplicationRequest::default()
        }
        .validate()
        .expect_err("missing owner");
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("ownerName")));

        let err = FinancialReportRequest {
            restaurant_name: Some("Köfteci".to_string()),
            email: Some("ramiz@example.com".to_string()),
            period: Some("Mart 2026".to_string()),
            total_orders: Some(12),
            ..FinancialReportRequest::default()
        }
        .validate()
        .expect_err("missing revenue");
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("totalRevenue")));
    }

    #[test]
    fn test_templates_render() {
        let application = application();
        let html = RestaurantApplicationHtml {
            application: &application,
        }
        .render()
        .expect("html");
        assert!(html.contains("Köfteci Ramiz"));

        let report = FinancialReport {
            restaurant_name: "Köfteci Ramiz".to_string(),
            email: Email::parse("ramiz@example.com").expect("email"),
            period: "Mart 2026".to_string(),
            total_orders: 42,
            total_revenue: Lira::from_kurus(1_250_000),
            commission: Lira::from_kurus(125_000),
            net_amount: Lira::from_kurus(1_125_000),
        };
        let text = FinancialReportText { report: &report }.render().expect("text");
        assert!(text.contains("12500.00 TL"));
        assert!(text.contains("42"));
    }

    #[tokio::test]
    async fn test_non_production_only_logs() {
        let service = EmailService::new(&config(), Environment::Development).expect("service");
        let delivery = service
            .send_restaurant_application(&application())
            .await
            .expect("logged");
        assert_eq!(delivery, Delivery::Logged);
    }

    #[tokio::test]
    async fn test_production_without_credentials_fails() {
        let service = EmailService::new(&config(), Environment::Production).expect("service");
        let result = service.send_restaurant_application(&application()).await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }
}
