//! Conversions between SDK shapes and the port records
//!
//! SDK accessors return either bare values or `Option`s depending on whether
//! the service model marks a member as required. The traits here flatten
//! both to `Option` so the adapters read the same either way.

use anyhow::anyhow;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::DateTime as SmithyDateTime;
use chrono::{DateTime, Utc};

/// Owned copy of an accessor value
pub(crate) trait Owned<T> {
    fn owned(self) -> Option<T>;
}

impl Owned<String> for &str {
    fn owned(self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Owned<String> for Option<&str> {
    fn owned(self) -> Option<String> {
        self.map(str::to_string)
    }
}

macro_rules! owned_copy {
    ($($t:ty),*) => {
        $(
            impl Owned<$t> for $t {
                fn owned(self) -> Option<$t> {
                    Some(self)
                }
            }

            impl Owned<$t> for Option<$t> {
                fn owned(self) -> Option<$t> {
                    self
                }
            }
        )*
    };
}

owned_copy!(bool, i32, i64, f64);

/// Borrowed shape that may or may not be wrapped in `Option`
pub(crate) trait Maybe<'a, T> {
    fn maybe(self) -> Option<&'a T>;
}

impl<'a, T> Maybe<'a, T> for &'a T {
    fn maybe(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T> Maybe<'a, T> for Option<&'a T> {
    fn maybe(self) -> Option<&'a T> {
        self
    }
}

/// List accessor that may or may not be wrapped in `Option`
pub(crate) trait Items<'a, T> {
    fn items(self) -> &'a [T];
}

impl<'a, T> Items<'a, T> for &'a [T] {
    fn items(self) -> &'a [T] {
        self
    }
}

impl<'a, T> Items<'a, T> for Option<&'a [T]> {
    fn items(self) -> &'a [T] {
        self.unwrap_or_default()
    }
}

pub(crate) fn to_smithy(ts: DateTime<Utc>) -> SmithyDateTime {
    SmithyDateTime::from_secs(ts.timestamp())
}

pub(crate) fn from_smithy(ts: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

/// Flatten an SDK error with its full source chain
pub(crate) fn sdk_error<E>(err: E) -> anyhow::Error
where
    E: std::error::Error + 'static,
{
    anyhow!("{}", DisplayErrorContext(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_owned_flattens_options() {
        let bare: Option<String> = "x".owned();
        let wrapped: Option<String> = Some("y").owned();
        let none: Option<i32> = None::<i32>.owned();
        assert_eq!(bare.as_deref(), Some("x"));
        assert_eq!(wrapped.as_deref(), Some("y"));
        assert_eq!(none, None);
        assert_eq!(7i32.owned(), Some(7));
    }

    #[test]
    fn test_items_defaults_to_empty() {
        let none: Option<&[u8]> = None;
        assert!(none.items().is_empty());
        let bare: &[u8] = &[1, 2];
        assert_eq!(bare.items().len(), 2);
    }

    #[test]
    fn test_smithy_round_trip_preserves_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 15).unwrap();
        assert_eq!(from_smithy(&to_smithy(ts)), Some(ts));
    }
}
