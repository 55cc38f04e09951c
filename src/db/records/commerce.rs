use nawth_schema::{
    NewOrder, NewPayment, NewPaymentIntent, Order, OrderPatch, Payment, PaymentIntent,
    PaymentIntentPatch, PaymentPatch,
};

use crate::db::backend::{Assignment, TableSpec};
use crate::db::codec::{Record, RowReader, encode_array, encode_object};
use crate::db::value::Row;
use crate::error::StoreError;

pub const DEFAULT_CURRENCY: &str = "USD";

fn currency_or_default(currency: String) -> String {
    if currency.trim().is_empty() {
        DEFAULT_CURRENCY.to_string()
    } else {
        currency
    }
}

impl Record for Order {
    type New = NewOrder;
    type Patch = OrderPatch;

    const TABLE: TableSpec = TableSpec {
        name: "orders",
        id_prefix: "order",
        soft_delete: false,
        unique: &[],
    };
    const FILTERABLE: &'static [&'static str] =
        &["user_id", "service_id", "status", "amount", "created_at"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
        ("amount", "amount"),
        ("status", "status"),
    ];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(Order {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            service_id: r.text("service_id")?,
            status: r.parse("status")?,
            amount: r.real("amount")?,
            notes: r.opt_text("notes"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            completed_at: r.opt_timestamp("completed_at")?,
            cancelled_at: r.opt_timestamp("cancelled_at")?,
        })
    }

    fn encode_new(new: NewOrder) -> Vec<Assignment> {
        vec![
            Assignment::new("user_id", new.user_id),
            Assignment::new("service_id", new.service_id),
            Assignment::new("status", new.status.as_str()),
            Assignment::new("amount", new.amount),
            Assignment::new("notes", new.notes),
            Assignment::new("completed_at", None::<String>),
            Assignment::new("cancelled_at", None::<String>),
        ]
    }

    fn encode_patch(patch: &OrderPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = patch.status {
            set.push(Assignment::new("status", v.as_str()));
        }
        if let Some(v) = patch.amount {
            set.push(Assignment::new("amount", v));
        }
        if let Some(v) = &patch.notes {
            set.push(Assignment::new("notes", v.clone()));
        }
        if let Some(v) = patch.completed_at {
            set.push(Assignment::new("completed_at", v));
        }
        if let Some(v) = patch.cancelled_at {
            set.push(Assignment::new("cancelled_at", v));
        }
        set
    }
}

impl Record for Payment {
    type New = NewPayment;
    type Patch = PaymentPatch;

    const TABLE: TableSpec = TableSpec {
        name: "payments",
        id_prefix: "pay",
        soft_delete: false,
        unique: &[],
    };
    const FILTERABLE: &'static [&'static str] =
        &["order_id", "status", "currency", "transaction_id", "amount"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("amount", "amount"),
        ("status", "status"),
    ];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(Payment {
            id: r.text("id")?,
            order_id: r.text("order_id")?,
            amount: r.real("amount")?,
            currency: r.text("currency")?,
            status: r.parse("status")?,
            payment_method: r.opt_text("payment_method"),
            transaction_id: r.opt_text("transaction_id"),
            metadata: r.object("metadata"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            completed_at: r.opt_timestamp("completed_at")?,
        })
    }

    fn encode_new(new: NewPayment) -> Vec<Assignment> {
        vec![
            Assignment::new("order_id", new.order_id),
            Assignment::new("amount", new.amount),
            Assignment::new("currency", currency_or_default(new.currency)),
            Assignment::new("status", new.status.as_str()),
            Assignment::new("payment_method", new.payment_method),
            Assignment::new("transaction_id", new.transaction_id),
            Assignment::new("metadata", encode_object(&new.metadata)),
            Assignment::new("completed_at", None::<String>),
        ]
    }

    fn encode_patch(patch: &PaymentPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = patch.status {
            set.push(Assignment::new("status", v.as_str()));
        }
        if let Some(v) = &patch.payment_method {
            set.push(Assignment::new("payment_method", v.clone()));
        }
        if let Some(v) = &patch.transaction_id {
            set.push(Assignment::new("transaction_id", v.clone()));
        }
        if let Some(v) = &patch.metadata {
            set.push(Assignment::new("metadata", encode_object(v)));
        }
        if let Some(v) = patch.completed_at {
            set.push(Assignment::new("completed_at", v));
        }
        set
    }
}

impl Record for PaymentIntent {
    type New = NewPaymentIntent;
    type Patch = PaymentIntentPatch;

    const TABLE: TableSpec = TableSpec {
        name: "payment_intents",
        id_prefix: "pi",
        soft_delete: false,
        unique: &["client_secret"],
    };
    const FILTERABLE: &'static [&'static str] = &["order_id", "status", "currency"];
    const SORTABLE: &'static [(&'static str, &'static str)] =
        &[("created_at", "created_at"), ("amount", "amount")];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(PaymentIntent {
            id: r.text("id")?,
            order_id: r.text("order_id")?,
            amount: r.real("amount")?,
            currency: r.text("currency")?,
            status: r.parse("status")?,
            client_secret: r.text("client_secret")?,
            payment_method_types: r.array("payment_method_types"),
            metadata: r.object("metadata"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
        })
    }

    fn encode_new(new: NewPaymentIntent) -> Vec<Assignment> {
        vec![
            Assignment::new("order_id", new.order_id),
            Assignment::new("amount", new.amount),
            Assignment::new("currency", currency_or_default(new.currency)),
            Assignment::new("status", new.status.as_str()),
            Assignment::new("client_secret", new.client_secret),
            Assignment::new(
                "payment_method_types",
                encode_array(&new.payment_method_types),
            ),
            Assignment::new("metadata", encode_object(&new.metadata)),
        ]
    }

    fn encode_patch(patch: &PaymentIntentPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = patch.status {
            set.push(Assignment::new("status", v.as_str()));
        }
        if let Some(v) = &patch.payment_method_types {
            set.push(Assignment::new("payment_method_types", encode_array(v)));
        }
        if let Some(v) = &patch.metadata {
            set.push(Assignment::new("metadata", encode_object(v)));
        }
        set
    }
}
