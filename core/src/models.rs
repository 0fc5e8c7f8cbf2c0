//! Entity records of the bookkeeping API.
//!
//! # Design
//! Every field is optional: the API treats a missing field as "unset", and
//! `id` only exists once the server has stored the record. Rust names are
//! snake_case; each field declares its camelCase wire name, which also
//! feeds the static `FIELDS` descriptors used in parse diagnostics.
//!
//! Amounts, rates and quantities are kept as `serde_json::Number`, so an
//! integer on the wire is written back as an integer.
//!
//! Closed vocabularies (`Group`, `CategoryType`, `MoneybagType`) keep an
//! `Other` variant so tokens this crate does not know survive a round trip.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Number, Value};

pub use crate::codec::WireDate;

/// Opaque nested line item (deal jobs, goods and stages).
pub type LineItem = Map<String, Value>;

/// Shape of a declared field, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Number,
    Text,
    Boolean,
    Date,
    Token,
    TextList,
    LineItems,
}

/// Compile-time description of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

/// An entity that repositories can decode and encode.
pub trait Model: Serialize + serde::de::DeserializeOwned + Send + Sync + 'static {
    /// Entity name used in error messages and logs.
    const KIND: &'static str;
    /// Declared wire fields, in declaration order.
    const FIELDS: &'static [FieldSpec];
}

macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $token:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A token this crate does not know, kept verbatim.
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $token,)+
                    $name::Other(raw) => raw,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }
        }

        impl From<&str> for $name {
            fn from(token: &str) -> Self {
                match token {
                    $($token => $name::$variant,)+
                    other => $name::Other(other.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct TokenVisitor;

                impl Visitor<'_> for TokenVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str(concat!("a ", stringify!($name), " token"))
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<$name, E> {
                        Ok($name::from(v))
                    }
                }

                deserializer.deserialize_str(TokenVisitor)
            }
        }
    };
}

token_enum! {
    /// Direction of money flow for categories and transactions.
    pub enum Group {
        Income = "income",
        Outcome = "outcome",
        Transfer = "transfer",
    }
}

token_enum! {
    /// Cash-flow activity a category belongs to.
    pub enum CategoryType {
        Operating = "operating",
        Financial = "financial",
        Investment = "investment",
    }
}

token_enum! {
    /// Kind of account.
    pub enum MoneybagType {
        Cash = "nal",
        Bank = "bank",
        Card = "card",
        Electronic = "electron",
        Acquiring = "acquiring",
    }
}

macro_rules! model {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($(#[$fmeta:meta])* $field:ident = $wire:literal : $ty:ty => $ft:ident,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                #[serde(rename = $wire, default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )+
        }

        impl Model for $name {
            const KIND: &'static str = stringify!($name);
            const FIELDS: &'static [FieldSpec] = &[
                $(FieldSpec { name: $wire, ty: FieldType::$ft },)+
            ];
        }
    };
}

model! {
    /// Cash-flow category (article).
    pub struct Category {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        parent_id = "parentId": i64 => Integer,
        group = "group": Group => Token,
        kind = "type": CategoryType => Token,
        pnl_type = "pnlType": String => Text,
        description = "description": String => Text,
        is_built_in = "isBuiltIn": bool => Boolean,
    }
}

model! {
    /// Account holding money: cash desk, bank account, card and so on.
    pub struct Moneybag {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        kind = "type": MoneybagType => Token,
        number = "number": String => Text,
        currency = "currency": String => Text,
        balance = "balance": Number => Number,
        surplus = "surplus": Number => Number,
        surplus_timestamp = "surplusTimestamp": String => Text,
        group_id = "groupId": i64 => Integer,
        archived = "archived": bool => Boolean,
        hide_in_total = "hideInTotal": bool => Boolean,
        without_nds = "withoutNds": bool => Boolean,
    }
}

model! {
    /// Counterparty.
    pub struct Partner {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        /// Taxpayer identification number.
        inn = "inn": String => Text,
        group_id = "groupId": i64 => Integer,
        comment = "comment": String => Text,
    }
}

model! {
    /// Business direction.
    pub struct Direction {
        id = "id": i64 => Integer,
        name = "name": String => Text,
    }
}

model! {
    /// Cash-flow operation. Transfers use `value2`/`moneybag2_id` for the
    /// receiving leg.
    pub struct Transaction {
        id = "id": i64 => Integer,
        external_id = "externalId": i64 => Integer,
        value = "value": Number => Number,
        moneybag_id = "moneybagId": i64 => Integer,
        group = "group": Group => Token,
        value2 = "value2": Number => Number,
        moneybag2_id = "moneybag2Id": i64 => Integer,
        parent_id = "parentId": i64 => Integer,
        description = "description": String => Text,
        date = "date": WireDate => Date,
        timestamp = "timestamp": String => Text,
        is_plan = "isPlan": bool => Boolean,
        category_id = "categoryId": i64 => Integer,
        partner_id = "partnerId": i64 => Integer,
        direction_id = "directionId": i64 => Integer,
        deal_id = "dealId": i64 => Integer,
        obligation_id = "obligationId": i64 => Integer,
        fact_month = "factMonth": String => Text,
        spread_monthes = "spreadMonthes": Vec<String> => TextList,
        /// VAT amount.
        nds = "nds": Number => Number,
        obtaining_id = "obtainingId": i64 => Integer,
        /// Exchange rate.
        course = "course": Number => Number,
    }
}

model! {
    pub struct Deal {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        jobs = "jobs": Vec<LineItem> => LineItems,
        goods = "goods": Vec<LineItem> => LineItems,
        direction_id = "directionId": i64 => Integer,
        amount = "amount": Number => Number,
        currency = "currency": String => Text,
        custom_cost_price = "customCostPrice": Number => Number,
        status_id = "statusId": i64 => Integer,
        partner_id = "partnerId": i64 => Integer,
        responsible_id = "responsibleId": i64 => Integer,
        comment = "comment": String => Text,
        start_date = "startDate": String => Text,
        end_date = "endDate": String => Text,
        act_date = "actDate": String => Text,
        nds = "nds": Number => Number,
        stages = "stages": Vec<LineItem> => LineItems,
    }
}

model! {
    pub struct Employee {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        date = "date": WireDate => Date,
        positions = "positions": Vec<String> => TextList,
        currency = "currency": String => Text,
        regularfix = "regularfix": Number => Number,
        regularfee = "regularfee": Number => Number,
        regulartax = "regulartax": Number => Number,
        inn = "inn": String => Text,
        hired = "hired": String => Text,
        fired = "fired": String => Text,
        comment = "comment": String => Text,
    }
}

model! {
    /// Inventory item.
    pub struct Goods {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        cost = "cost": Number => Number,
        comment = "comment": String => Text,
        quantity = "quantity": Number => Number,
        start_quantity = "startQuantity": Number => Number,
        avg_cost = "avgCost": Number => Number,
    }
}

model! {
    /// Service offered in deals.
    pub struct Job {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        cost = "cost": Number => Number,
        comment = "comment": String => Text,
    }
}

model! {
    pub struct Obligation {
        id = "id": i64 => Integer,
        name = "name": String => Text,
        category_id = "categoryId": i64 => Integer,
        direction_id = "directionId": i64 => Integer,
        deal_id = "dealId": i64 => Integer,
        amount = "amount": Number => Number,
        currency = "currency": String => Text,
        status_id = "statusId": i64 => Integer,
        partner_id = "partnerId": i64 => Integer,
        comment = "comment": String => Text,
        act_date = "actDate": String => Text,
        nds = "nds": Number => Number,
    }
}

model! {
    pub struct MoneybagGroup {
        id = "id": i64 => Integer,
        name = "name": String => Text,
    }
}

model! {
    pub struct PartnerGroup {
        id = "id": i64 => Integer,
        name = "name": String => Text,
    }
}

model! {
    pub struct DealStatus {
        id = "id": i64 => Integer,
        name = "name": String => Text,
    }
}

model! {
    pub struct ObligationStatus {
        id = "id": i64 => Integer,
        name = "name": String => Text,
    }
}
