use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ZeroedError;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = ZeroedError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ZeroedError::Other(format!(
                        concat!("Invalid ", stringify!($name), " '{}' (expected one of: {})"),
                        other,
                        Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
                let s = value.as_str()?;
                s.parse()
                    .map_err(|e: ZeroedError| rusqlite::types::FromSqlError::Other(e.to_string().into()))
            }
        }
    };
}

string_enum!(
    /// Kind of financial account.
    AccountType {
        Checking => "checking",
        Savings => "savings",
        CreditCard => "credit_card",
        Cash => "cash",
        Investment => "investment",
    }
);

string_enum!(
    TransactionType {
        Inflow => "inflow",
        Outflow => "outflow",
        Transfer => "transfer",
    }
);

string_enum!(
    /// How a payee match rule compares its pattern to a payee name.
    MatchType {
        Contains => "contains",
        StartsWith => "starts_with",
        Exact => "exact",
        Regex => "regex",
    }
);

string_enum!(
    GoalType {
        TargetBalance => "target_balance",
        TargetByDate => "target_by_date",
        MonthlyFunding => "monthly_funding",
        Spending => "spending",
    }
);

impl AccountType {
    /// "credit_card" -> "Credit Card"
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TransactionType {
    pub fn for_amount(amount: f64) -> Self {
        if amount > 0.0 {
            Self::Inflow
        } else {
            Self::Outflow
        }
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: AccountType,
    pub institution: Option<String>,
    pub current_balance: f64,
    pub cleared_balance: f64,
    pub is_on_budget: bool,
    pub is_closed: bool,
}

#[derive(Debug, Clone)]
pub struct CategoryGroup {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone)]
pub struct Payee {
    pub id: i64,
    pub name: String,
}

/// A rule as the categorizer sees it: the category comes from the rule's payee.
#[derive(Debug, Clone)]
pub struct MatchRule {
    pub id: i64,
    pub pattern: String,
    pub match_type: MatchType,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: i64,
    pub account_id: i64,
    pub category_id: Option<i64>,
    pub payee_id: Option<i64>,
    pub date: String,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub memo: Option<String>,
    pub is_cleared: bool,
    pub import_id: Option<String>,
    pub import_source: Option<String>,
    pub raw_payee_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Goal {
    pub goal_type: GoalType,
    pub target_amount: Option<f64>,
    pub target_date: Option<String>,
    pub monthly_funding: Option<f64>,
}

/// Saved CSV column mapping for a bank whose export no builtin format handles.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportProfile {
    pub id: i64,
    pub name: String,
    pub institution: Option<String>,
    pub date_column: String,
    pub date_format: String,
    pub amount_column: Option<String>,
    pub amount_inflow_column: Option<String>,
    pub amount_outflow_column: Option<String>,
    pub payee_column: String,
    pub memo_column: Option<String>,
    pub skip_header_rows: i64,
    pub amount_multiplier: f64,
}

/// Intermediate representation from a CSV parser before DB insert.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: String,
    pub amount: f64,
    pub payee: String,
    pub memo: Option<String>,
    pub import_source: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parse_roundtrip() {
        for t in AccountType::ALL {
            assert_eq!(t.as_str().parse::<AccountType>().unwrap(), *t);
        }
        assert_eq!("Starts_With".parse::<MatchType>().unwrap(), MatchType::StartsWith);
    }

    #[test]
    fn test_enum_parse_rejects_unknown() {
        let err = "brokerage".parse::<AccountType>().unwrap_err();
        assert!(err.to_string().contains("checking"));
    }

    #[test]
    fn test_account_type_label() {
        assert_eq!(AccountType::CreditCard.label(), "Credit Card");
        assert_eq!(AccountType::Cash.label(), "Cash");
    }

    #[test]
    fn test_transaction_type_for_amount() {
        assert_eq!(TransactionType::for_amount(10.0), TransactionType::Inflow);
        assert_eq!(TransactionType::for_amount(-10.0), TransactionType::Outflow);
        assert_eq!(TransactionType::for_amount(0.0), TransactionType::Outflow);
    }
}
