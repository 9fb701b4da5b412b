use serde_json::{json, Value};

use crate::models::InvoiceRecord;

/// Builds the GSTR-1 return JSON for one filing period.
///
/// A downstream consumer of the store: callers fetch the period's records
/// via `list_by_period` (already filtered to live, return-eligible rows) and
/// hand them here. Invoices typed B2B with a buyer GSTIN are grouped under
/// that GSTIN (`ctin` buckets); everything else lands in the flat B2C list.
///
/// # Arguments
///
/// * `seller_gstin` - The filer's GSTIN
/// * `fp` - Filing period key, e.g. "082025"
/// * `invoices` - The period's return-eligible records
pub fn generate_gstr1_json(seller_gstin: &str, fp: &str, invoices: &[InvoiceRecord]) -> Value {
    let mut b2b: Vec<Value> = Vec::new();
    let mut b2c: Vec<Value> = Vec::new();

    for inv in invoices {
        let data = &inv.data;

        let item = json!({
            "inum": data.get("invoice_number"),
            "idt": data.get("invoice_date"),
            "val": data.get("invoice_total"),
            "pos": data.get("pos"),
            "itms": [{
                "txval": data.get("taxable_value"),
                "rt": tax_rate(data),
                "igst": number_or_zero(data, "igst"),
                "cgst": number_or_zero(data, "cgst"),
                "sgst": number_or_zero(data, "sgst"),
            }],
        });

        let buyer_gstin = data.get("buyer_gstin").and_then(|v| v.as_str());
        let is_b2b = data.get("invoice_type").and_then(|v| v.as_str()) == Some("B2B");

        match (is_b2b, buyer_gstin) {
            (true, Some(ctin)) => {
                let bucket = b2b
                    .iter_mut()
                    .find(|b| b.get("ctin").and_then(|c| c.as_str()) == Some(ctin));
                match bucket {
                    Some(buyer) => {
                        if let Some(list) = buyer.get_mut("inv").and_then(|i| i.as_array_mut()) {
                            list.push(item);
                        }
                    }
                    None => b2b.push(json!({"ctin": ctin, "inv": [item]})),
                }
            }
            _ => b2c.push(item),
        }
    }

    json!({
        "gstin": seller_gstin,
        "fp": fp,
        "version": "GST1.0",
        "b2b": b2b,
        "b2c": b2c,
    })
}

/// Effective tax rate as a whole percent: total tax over taxable value,
/// rounded. Zero when either side is missing or zero.
fn tax_rate(data: &Value) -> i64 {
    let tax = ["cgst", "sgst", "igst"]
        .iter()
        .map(|k| data.get(*k).and_then(|v| v.as_f64()).unwrap_or(0.0))
        .sum::<f64>();
    let taxable = data
        .get("taxable_value")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);

    if taxable == 0.0 || tax == 0.0 {
        return 0;
    }

    (tax / taxable * 100.0).round() as i64
}

fn number_or_zero(data: &Value, key: &str) -> f64 {
    data.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
}
