//! Enumerated status columns. Stored as their snake_case string form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a stored string does not name any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident: $default:ident => $default_text:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            #[default]
            $default,
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $name::$default => $default_text,
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $default_text => Ok($name::$default),
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    UserRole: User => "user" {
        Admin => "admin",
        Moderator => "moderator",
        Provider => "provider",
    }
}

string_enum! {
    UserStatus: Active => "active" {
        Inactive => "inactive",
        Suspended => "suspended",
        Banned => "banned",
        Deleted => "deleted",
    }
}

string_enum! {
    OrderStatus: Pending => "pending" {
        Confirmed => "confirmed",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
}

string_enum! {
    PaymentStatus: Pending => "pending" {
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
    }
}

string_enum! {
    PaymentIntentStatus: RequiresPaymentMethod => "requires_payment_method" {
        RequiresConfirmation => "requires_confirmation",
        RequiresAction => "requires_action",
        Processing => "processing",
        RequiresCapture => "requires_capture",
        Canceled => "canceled",
        Succeeded => "succeeded",
    }
}

string_enum! {
    /// Severity shown on a notification badge.
    NotificationKind: Info => "info" {
        Success => "success",
        Warning => "warning",
        Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_match_serde_names() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::InProgress,
            OrderStatus::Refunded,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json.as_str(), Some(status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert_eq!(
            PaymentIntentStatus::default().as_str(),
            "requires_payment_method"
        );
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = "archived".parse::<UserStatus>().unwrap_err();
        assert_eq!(err.kind, "UserStatus");
        assert_eq!(err.value, "archived");
    }
}
