use serde_json::{Map, Value, json};

// -----------------------------------------------------------------------------
// ----- Operation -------------------------------------------------------------

/// Application-level request, before it becomes a `{op, ...}` envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ListTypes,
    ListByType { tipo: String },
    GetItem { sku: String },
    Search { q: String },
    AddToCart { sku: String, cant: u64 },
    ShowCart,
    Checkout { cliente: Option<Value> },
}

impl Operation {
    pub fn code(&self) -> &'static str {
        match self {
            Operation::ListTypes => "lt",
            Operation::ListByType { .. } => "lbt",
            Operation::GetItem { .. } => "gi",
            Operation::Search { .. } => "srch",
            Operation::AddToCart { .. } => "atc",
            Operation::ShowCart => "sc",
            Operation::Checkout { .. } => "co",
        }
    }

    /// The JSON object written to the backend.
    pub fn envelope(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("op".to_string(), json!(self.code()));

        match self {
            Operation::ListTypes | Operation::ShowCart => {}
            Operation::ListByType { tipo } => {
                fields.insert("tipo".to_string(), json!(tipo));
            }
            Operation::GetItem { sku } => {
                fields.insert("sku".to_string(), json!(sku));
            }
            Operation::Search { q } => {
                fields.insert("q".to_string(), json!(q));
            }
            Operation::AddToCart { sku, cant } => {
                fields.insert("sku".to_string(), json!(sku));
                fields.insert("cant".to_string(), json!(cant));
            }
            Operation::Checkout { cliente } => {
                if let Some(cliente) = cliente {
                    fields.insert("cliente".to_string(), cliente.clone());
                }
            }
        }

        Value::Object(fields)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_operations_only_carry_the_code() {
        assert_eq!(Operation::ListTypes.envelope(), json!({ "op": "lt" }));
        assert_eq!(Operation::ShowCart.envelope(), json!({ "op": "sc" }));
    }

    #[test]
    fn operation_fields_are_included() {
        assert_eq!(
            Operation::ListByType { tipo: "Cuerdas".into() }.envelope(),
            json!({ "op": "lbt", "tipo": "Cuerdas" })
        );
        assert_eq!(
            Operation::AddToCart { sku: "G-01".into(), cant: 2 }.envelope(),
            json!({ "op": "atc", "sku": "G-01", "cant": 2 })
        );
    }

    #[test]
    fn checkout_without_client_omits_the_field() {
        assert_eq!(
            Operation::Checkout { cliente: None }.envelope(),
            json!({ "op": "co" })
        );
        assert_eq!(
            Operation::Checkout { cliente: Some(json!({ "nombre": "Ana" })) }.envelope(),
            json!({ "op": "co", "cliente": { "nombre": "Ana" } })
        );
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
