//! The credit-card fraud dataset: source tables, entities, and column tags.

use crate::config::DemoConfig;
use crate::store::{ColumnRoles, FeatureJobSetting, SourceTable, TableSpec};

pub const BANK_CUSTOMER: &str = "BANKCUSTOMER";
pub const STATE_DETAILS: &str = "STATEDETAILS";
pub const CREDIT_CARD: &str = "CREDITCARD";
pub const CARD_TRANSACTIONS: &str = "CARDTRANSACTIONS";
pub const CARD_FRAUD_STATUS: &str = "CARDFRAUDSTATUS";
pub const CARD_TRANSACTION_GROUPS: &str = "CARDTRANSACTIONGROUPS";

/// Registration order of the demo tables.
pub const TABLE_NAMES: [&str; 6] = [
    BANK_CUSTOMER,
    STATE_DETAILS,
    CREDIT_CARD,
    CARD_TRANSACTIONS,
    CARD_FRAUD_STATUS,
    CARD_TRANSACTION_GROUPS,
];

/// An entity and the serving names used to look it up at prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySpec {
    pub name: &'static str,
    pub serving_names: &'static [&'static str],
}

pub const ENTITIES: [EntitySpec; 7] = [
    EntitySpec {
        name: "bank_customer",
        serving_names: &["BANKCUSTOMERID"],
    },
    EntitySpec {
        name: "USA_state",
        serving_names: &["STATECODE"],
    },
    EntitySpec {
        name: "credit_card",
        serving_names: &["ACCOUNTID"],
    },
    EntitySpec {
        name: "card_transaction",
        serving_names: &["CARDTRANSACTIONID"],
    },
    EntitySpec {
        name: "card_transaction_description",
        serving_names: &["CARDTRANSACTIONDESCRIPTION"],
    },
    EntitySpec {
        name: "gender",
        serving_names: &["GENDER"],
    },
    EntitySpec {
        name: "transaction_group",
        serving_names: &["TRANSACTIONGROUP"],
    },
];

/// A table column that identifies an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnTag {
    pub table: &'static str,
    pub column: &'static str,
    pub entity: &'static str,
}

const fn tag(table: &'static str, column: &'static str, entity: &'static str) -> ColumnTag {
    ColumnTag {
        table,
        column,
        entity,
    }
}

pub const COLUMN_TAGS: [ColumnTag; 12] = [
    tag(BANK_CUSTOMER, "BankCustomerID", "bank_customer"),
    tag(BANK_CUSTOMER, "StateCode", "USA_state"),
    tag(BANK_CUSTOMER, "Gender", "gender"),
    tag(STATE_DETAILS, "StateCode", "USA_state"),
    tag(CREDIT_CARD, "AccountID", "credit_card"),
    tag(CREDIT_CARD, "BankCustomerID", "bank_customer"),
    tag(CARD_TRANSACTIONS, "CardTransactionID", "card_transaction"),
    tag(CARD_TRANSACTIONS, "AccountID", "credit_card"),
    tag(
        CARD_TRANSACTIONS,
        "CardTransactionDescription",
        "card_transaction_description",
    ),
    tag(CARD_FRAUD_STATUS, "CardTransactionID", "card_transaction"),
    tag(
        CARD_TRANSACTION_GROUPS,
        "CardTransactionDescription",
        "card_transaction_description",
    ),
    tag(CARD_TRANSACTION_GROUPS, "TransactionGroup", "transaction_group"),
];

/// Feature job setting for card transactions, from the feature job analysis
/// of the dataset.
pub fn card_transactions_job_setting() -> FeatureJobSetting {
    FeatureJobSetting::from_secs(120, 3600, 65)
}

fn some(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn scd(
    natural_key: &str,
    surrogate_key: &str,
    end_timestamp: Option<&str>,
    record_creation: Option<&str>,
) -> ColumnRoles {
    ColumnRoles::Scd {
        surrogate_key_column: some(surrogate_key),
        natural_key_column: natural_key.to_string(),
        effective_timestamp_column: "ValidFrom".to_string(),
        end_timestamp_column: end_timestamp.map(str::to_string),
        record_creation_timestamp_column: record_creation.map(str::to_string),
    }
}

/// Specs for the six demo tables, in registration order.
pub fn table_specs(config: &DemoConfig) -> Vec<TableSpec> {
    let spec = |name: &str, roles: ColumnRoles| TableSpec {
        name: name.to_string(),
        source: SourceTable {
            database_name: config.database_name.clone(),
            schema_name: config.schema_name.clone(),
            table_name: name.to_string(),
        },
        roles,
    };

    vec![
        spec(
            BANK_CUSTOMER,
            scd(
                "BankCustomerID",
                "RowID",
                Some("ValidTo"),
                Some("record_available_at"),
            ),
        ),
        spec(STATE_DETAILS, scd("StateCode", "StateGuid", None, None)),
        spec(CREDIT_CARD, scd("AccountID", "RowID", Some("ValidTo"), None)),
        spec(
            CARD_TRANSACTIONS,
            ColumnRoles::Event {
                event_id_column: "CardTransactionID".to_string(),
                event_timestamp_column: "Timestamp".to_string(),
                event_timestamp_timezone_offset_column: some("tz_offset"),
                record_creation_timestamp_column: some("record_available_at"),
            },
        ),
        spec(
            CARD_FRAUD_STATUS,
            scd(
                "CardTransactionID",
                "RowID",
                Some("ValidTo"),
                Some("record_available_at"),
            ),
        ),
        spec(
            CARD_TRANSACTION_GROUPS,
            ColumnRoles::Dimension {
                dimension_id_column: "CardTransactionDescription".to_string(),
                record_creation_timestamp_column: None,
            },
        ),
    ]
}
