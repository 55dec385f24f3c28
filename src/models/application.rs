use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::numeric;

/// Identifier column, never fed to the model.
pub const ID_COLUMN: &str = "SK_ID_CURR";
/// Ground-truth label column, never fed to the model.
pub const LABEL_COLUMN: &str = "TARGET";
/// Engineered feature appended after the schema features.
pub const CREDIT_TO_INCOME_COLUMN: &str = "CREDIT_TO_INCOME";

/// One entry of the canonical ⇄ wire field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldName {
    pub canonical: &'static str,
    pub wire: &'static str,
}

macro_rules! canonical_or_wire {
    ($wire:literal) => {
        $wire
    };
    ($wire:literal, $canonical:literal) => {
        $canonical
    };
}

/// Declares `ApplicationRecord`, its field table and its raw feature
/// extraction from a single field list, so the three can never drift apart.
///
/// Entries read `field: type => "wire name"`, optionally followed by
/// `| "canonical name"` when the wire name is not a plain identifier.
macro_rules! application_schema {
    ($( $field:ident : $ty:ty => $wire:literal $(| $canonical:literal)? ),* $(,)?) => {
        /// One loan application as received on the wire or stored in the
        /// training dataset.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct ApplicationRecord {
            #[serde(rename = "SK_ID_CURR", deserialize_with = "numeric::deserialize")]
            pub sk_id_curr: i64,
            /// Fraud label; present in training data, ignored for scoring.
            #[serde(
                rename = "TARGET",
                default,
                deserialize_with = "numeric::deserialize_optional"
            )]
            pub target: Option<i64>,
            $(
                #[serde(rename = $wire $(, alias = $canonical)?, deserialize_with = "numeric::deserialize")]
                pub $field: $ty,
            )*
        }

        /// Feature columns in model order, excluding the engineered ratio.
        pub const FEATURE_FIELDS: &[FieldName] = &[
            $( FieldName { canonical: canonical_or_wire!($wire $(, $canonical)?), wire: $wire }, )*
        ];

        impl ApplicationRecord {
            /// Schema features in `FEATURE_FIELDS` order.
            pub fn raw_features(&self) -> Vec<f64> {
                vec![ $( numeric::Numeric::to_f64(self.$field), )* ]
            }
        }
    };
}

application_schema! {
    name_contract_type: i64 => "NAME_CONTRACT_TYPE",
    code_gender: i64 => "CODE_GENDER",
    flag_own_car: i64 => "FLAG_OWN_CAR",
    flag_own_realty: i64 => "FLAG_OWN_REALTY",
    cnt_children: i64 => "CNT_CHILDREN",
    amt_income_total: f64 => "AMT_INCOME_TOTAL",
    amt_credit: f64 => "AMT_CREDIT",
    amt_annuity: f64 => "AMT_ANNUITY",
    amt_goods_price: f64 => "AMT_GOODS_PRICE",
    days_birth: i64 => "DAYS_BIRTH",
    days_employed: i64 => "DAYS_EMPLOYED",
    days_registration: f64 => "DAYS_REGISTRATION",
    cnt_fam_members: f64 => "CNT_FAM_MEMBERS",
    flag_emp_phone: i64 => "FLAG_EMP_PHONE",
    flag_work_phone: i64 => "FLAG_WORK_PHONE",
    flag_cont_mobile: i64 => "FLAG_CONT_MOBILE",
    flag_email: i64 => "FLAG_EMAIL",
    region_rating_client: i64 => "REGION_RATING_CLIENT",
    reg_region_not_live_region: i64 => "REG_REGION_NOT_LIVE_REGION",
    prev_amt_credit_mean: f64 => "PREV_AMT_CREDIT_mean",
    prev_amt_credit_max: f64 => "PREV_AMT_CREDIT_max",
    prev_cnt_payment_mean: f64 => "PREV_CNT_PAYMENT_mean",
    prev_nflag_last_appl_in_day_sum: i64 => "PREV_NFLAG_LAST_APPL_IN_DAY_sum",
    prev_days_decision_mean: f64 => "PREV_DAYS_DECISION_mean",
    prev_status_approved_sum: i64 => "PREV_NAME_CONTRACT_STATUS_Approved_sum",
    prev_status_refused_sum: i64 => "PREV_NAME_CONTRACT_STATUS_Refused_sum",
    prev_status_canceled_sum: i64 => "PREV_NAME_CONTRACT_STATUS_Canceled_sum",
    prev_status_unused_offer_sum: i64 => "PREV_NAME_CONTRACT_STATUS_Unused offer_sum"
        | "PREV_NAME_CONTRACT_STATUS_Unused_offer_sum",
    prev_client_type_new_sum: i64 => "PREV_NAME_CLIENT_TYPE_New_sum",
    prev_client_type_repeater_sum: i64 => "PREV_NAME_CLIENT_TYPE_Repeater_sum",
    prev_client_type_refreshed_sum: i64 => "PREV_NAME_CLIENT_TYPE_Refreshed_sum",
    prev_client_type_xna_sum: i64 => "PREV_NAME_CLIENT_TYPE_XNA_sum",
    family_status_married: i64 => "NAME_FAMILY_STATUS_Married",
    family_status_separated: i64 => "NAME_FAMILY_STATUS_Separated",
    family_status_single_not_married: i64 => "NAME_FAMILY_STATUS_Single / not married"
        | "NAME_FAMILY_STATUS_Single_not_married",
    family_status_widow: i64 => "NAME_FAMILY_STATUS_Widow",
    income_type_public: i64 => "NAME_INCOME_TYPE_Public",
    income_type_retired: i64 => "NAME_INCOME_TYPE_Retired",
    income_type_working: i64 => "NAME_INCOME_TYPE_Working",
    education_type_lower: i64 => "NAME_EDUCATION_TYPE_Lower",
    education_type_secondary: i64 => "NAME_EDUCATION_TYPE_Secondary",
    housing_type_stable: i64 => "NAME_HOUSING_TYPE_Stable",
    housing_type_with_parents: i64 => "NAME_HOUSING_TYPE_With parents"
        | "NAME_HOUSING_TYPE_With_parents",
    occupation_type_service: i64 => "OCCUPATION_TYPE_Service",
    occupation_type_unknown: i64 => "OCCUPATION_TYPE_Unknown",
    occupation_type_white_collar: i64 => "OCCUPATION_TYPE_White collar"
        | "OCCUPATION_TYPE_White_collar",
    organization_type_business: i64 => "ORGANIZATION_TYPE_Business",
    organization_type_government: i64 => "ORGANIZATION_TYPE_Government",
    organization_type_health_education: i64 => "ORGANIZATION_TYPE_Health/Education"
        | "ORGANIZATION_TYPE_Health_Education",
    organization_type_industry: i64 => "ORGANIZATION_TYPE_Industry",
    organization_type_services: i64 => "ORGANIZATION_TYPE_Services",
    organization_type_trade: i64 => "ORGANIZATION_TYPE_Trade",
    organization_type_transport: i64 => "ORGANIZATION_TYPE_Transport",
}

impl ApplicationRecord {
    /// Label as a binary class, if it is a valid 0/1 value.
    pub fn label(&self) -> Option<u8> {
        match self.target {
            Some(0) => Some(0),
            Some(1) => Some(1),
            _ => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.target == Some(1)
    }

    pub fn is_negative(&self) -> bool {
        self.target == Some(0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field table entry {0} has an empty name")]
    EmptyName(usize),

    #[error("canonical name {0:?} is declared more than once")]
    DuplicateCanonical(&'static str),

    #[error("wire name {0:?} is declared more than once")]
    DuplicateWire(&'static str),

    #[error("wire name {wire:?} collides with the canonical name of another field")]
    AmbiguousName { wire: &'static str },

    #[error("{0:?} is a reserved column and cannot be a feature")]
    Reserved(&'static str),
}

/// Check the field table for completeness and unambiguity.
pub fn validate_schema() -> Result<(), SchemaError> {
    validate_fields(FEATURE_FIELDS)
}

fn validate_fields(fields: &[FieldName]) -> Result<(), SchemaError> {
    const RESERVED: [&str; 3] = [ID_COLUMN, LABEL_COLUMN, CREDIT_TO_INCOME_COLUMN];

    let mut canonical = HashSet::new();
    let mut wire = HashSet::new();

    for (i, field) in fields.iter().enumerate() {
        if field.canonical.is_empty() || field.wire.is_empty() {
            return Err(SchemaError::EmptyName(i));
        }
        for name in [field.canonical, field.wire] {
            if RESERVED.contains(&name) {
                return Err(SchemaError::Reserved(name));
            }
        }
        if !canonical.insert(field.canonical) {
            return Err(SchemaError::DuplicateCanonical(field.canonical));
        }
        if !wire.insert(field.wire) {
            return Err(SchemaError::DuplicateWire(field.wire));
        }
    }

    // A wire name may only equal its own canonical name.
    for field in fields {
        let clashes = fields
            .iter()
            .any(|other| other.canonical == field.wire && other.wire != field.wire);
        if clashes {
            return Err(SchemaError::AmbiguousName { wire: field.wire });
        }
    }

    Ok(())
}

pub fn wire_name(canonical: &str) -> Option<&'static str> {
    FEATURE_FIELDS
        .iter()
        .find(|f| f.canonical == canonical)
        .map(|f| f.wire)
}

pub fn canonical_name(wire: &str) -> Option<&'static str> {
    FEATURE_FIELDS
        .iter()
        .find(|f| f.wire == wire)
        .map(|f| f.canonical)
}
