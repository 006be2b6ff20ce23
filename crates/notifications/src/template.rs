//! Per-status message templates and their rendering.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};

use bookhub_orders::OrderStatus;

use crate::{Locale, NotificationType};

/// Who receives the notification for a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientMode {
    /// One recipient per distinct publisher on the order's line items.
    Publishers,
    /// The user who placed the order.
    Customer,
}

/// Date fields interpolated into titles, taken from the placement time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateAttrs {
    pub order_code: String,
    pub weekday: Weekday,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    /// `HH:MM`, 24-hour clock.
    pub time: String,
}

impl DateAttrs {
    /// Render `placed_at` in the display offset.
    pub fn new(order_code: &str, placed_at: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = placed_at.with_timezone(&offset);
        Self {
            order_code: order_code.to_string(),
            weekday: local.weekday(),
            day: local.day(),
            month: local.month(),
            year: local.year(),
            time: format!("{:02}:{:02}", local.hour(), local.minute()),
        }
    }

    fn placed_on(&self, locale: Locale) -> String {
        match locale {
            Locale::English => format!(
                "{} {} {} {} at {}",
                locale.weekday_name(self.weekday),
                locale.day_of_month(self.day),
                locale.month_name(self.month),
                self.year,
                self.time
            ),
            Locale::Nepali => format!(
                "{}, {} {} {} {}",
                locale.weekday_name(self.weekday),
                self.year,
                locale.month_name(self.month),
                locale.day_of_month(self.day),
                self.time
            ),
        }
    }
}

/// Rendered text for one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub notification_type: NotificationType,
    pub recipients: RecipientMode,
    pub heading: &'static str,
    pub title_en: String,
    pub title_ne: String,
    /// Mail subject, also used as the mail body text.
    pub mail_subject: String,
}

/// Render the template for `status`.
///
/// Returns `None` for statuses without a template.
pub fn render(status: OrderStatus, attrs: &DateAttrs) -> Option<RenderedNotification> {
    let code = &attrs.order_code;
    let on_en = attrs.placed_on(Locale::English);
    let on_ne = attrs.placed_on(Locale::Nepali);

    let rendered = match status {
        OrderStatus::Received => RenderedNotification {
            notification_type: NotificationType::OrderReceived,
            recipients: RecipientMode::Publishers,
            heading: "Thank you for your purchase!",
            title_en: format!("Your order {code} placed on {on_en} has been received."),
            title_ne: format!("तपाईंको अर्डर {code} ({on_ne} मा राखिएको) प्राप्त भएको छ।"),
            mail_subject: format!(
                "Your order {code} placed on {on_en} has been received with details as below."
            ),
        },
        OrderStatus::Packed => RenderedNotification {
            notification_type: NotificationType::OrderPacked,
            recipients: RecipientMode::Customer,
            heading: "Thank you for your purchase!",
            title_en: format!("Your order {code} placed on {on_en} has been packed."),
            title_ne: format!("तपाईंको अर्डर {code} ({on_ne} मा राखिएको) प्याक गरिएको छ।"),
            mail_subject: format!(
                "Your order {code} placed on {on_en} has been packed with details as below."
            ),
        },
        OrderStatus::Completed => RenderedNotification {
            notification_type: NotificationType::OrderCompleted,
            recipients: RecipientMode::Customer,
            heading: "Your order has been delivered!",
            title_en: format!(
                "Your order {code} placed on {on_en} has been successfully delivered."
            ),
            title_ne: format!(
                "तपाईंको अर्डर {code} ({on_ne} मा राखिएको) सफलतापूर्वक डेलिभर गरिएको छ।"
            ),
            mail_subject: format!(
                "Thanks for shopping with us! We are glad to inform you that your order {code} has been successfully delivered with details as below."
            ),
        },
        OrderStatus::Cancelled => RenderedNotification {
            notification_type: NotificationType::OrderCancelled,
            recipients: RecipientMode::Customer,
            heading: "Your item(s) have been cancelled",
            title_en: format!("Your order {code} has been successfully cancelled."),
            title_ne: format!("तपाईंको अर्डर {code} सफलतापूर्वक रद्द गरिएको छ।"),
            mail_subject: format!("Your order {code} has been successfully cancelled."),
        },
        OrderStatus::Unrecognized => return None,
    };

    Some(rendered)
}
