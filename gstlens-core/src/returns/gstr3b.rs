use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::models::InvoiceRecord;

/// Builds the GSTR-3B summary return JSON for one filing period.
///
/// Sums taxable value and the three tax heads across the period's records,
/// rounded to two decimals with exact decimal arithmetic so repeated small
/// amounts do not drift.
pub fn generate_gstr3b_json(seller_gstin: &str, fp: &str, invoices: &[InvoiceRecord]) -> Value {
    let mut txval = Decimal::ZERO;
    let mut igst = Decimal::ZERO;
    let mut cgst = Decimal::ZERO;
    let mut sgst = Decimal::ZERO;

    for inv in invoices {
        let d = &inv.data;
        txval += decimal_field(d, "taxable_value");
        igst += decimal_field(d, "igst");
        cgst += decimal_field(d, "cgst");
        sgst += decimal_field(d, "sgst");
    }

    let txval = txval.round_dp(2);
    let igst = igst.round_dp(2);
    let cgst = cgst.round_dp(2);
    let sgst = sgst.round_dp(2);

    json!({
        "gstin": seller_gstin,
        "fp": fp,
        "version": "GST3B-1.0",
        "sup_details": {
            "osup_det": {
                "txval": txval,
                "igst": igst,
                "cgst": cgst,
                "sgst": sgst,
                "cess": 0,
            },
        },
        "tax_payable": {
            "igst": igst,
            "cgst": cgst,
            "sgst": sgst,
            "cess": 0,
        },
    })
}

fn decimal_field(data: &Value, key: &str) -> Decimal {
    data.get(key)
        .and_then(|v| v.as_f64())
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceStatus;
    use serde_json::json;

    fn record(data: Value) -> InvoiceRecord {
        InvoiceRecord {
            id: "t".to_string(),
            status: InvoiceStatus::Confirmed,
            fp: "082025".to_string(),
            data,
            created_at: 0,
            updated_at: 0,
            synced_to_cloud: true,
            deleted: false,
            cloud_id: String::new(),
        }
    }

    #[test]
    fn sums_tax_heads_across_the_period() {
        let invoices = vec![
            record(json!({"taxable_value": 100.50, "cgst": 9.045, "sgst": 9.045})),
            record(json!({"taxable_value": 200.0, "igst": 36.0})),
            record(json!({})),
        ];

        let out = generate_gstr3b_json("29BBBBB1111B1Z4", "082025", &invoices);

        assert_eq!(out["version"], json!("GST3B-1.0"));
        let det = &out["sup_details"]["osup_det"];
        assert_eq!(det["txval"], json!(300.5));
        assert_eq!(det["igst"], json!(36.0));
        assert_eq!(det["cgst"], json!(9.05), "rounded to two decimals");
        assert_eq!(det["sgst"], json!(9.05));
        assert_eq!(det["cess"], json!(0));
        assert_eq!(out["tax_payable"]["igst"], json!(36.0));
    }

    #[test]
    fn empty_period_yields_zero_liability() {
        let out = generate_gstr3b_json("g", "012025", &[]);
        assert_eq!(out["sup_details"]["osup_det"]["txval"], json!(0.0));
        assert_eq!(out["tax_payable"]["cgst"], json!(0.0));
    }
}
