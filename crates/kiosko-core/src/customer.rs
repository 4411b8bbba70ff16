//! Customer data captured at the CustomerData step.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::validation::{validate_customer_name, validate_document_number};

/// The buyer of the sale in progress.
///
/// Either a person (`first_name`, `last_name`) or a company
/// (`business_name`). `customer_id` is set when the data came from a
/// stored customer via document lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerData {
    pub customer_id: Option<String>,
    pub document_type_id: Option<String>,
    pub document_number: String,
    pub first_name: String,
    pub last_name: String,
    pub business_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Whether the order ships; adds the Shipping step to the wizard.
    pub requires_shipping: bool,
}

impl CustomerData {
    /// Document type, document number and some name are present.
    pub fn is_complete(&self) -> bool {
        self.document_type_id.is_some()
            && !self.document_number.trim().is_empty()
            && self.has_name()
    }

    fn has_name(&self) -> bool {
        !self.first_name.trim().is_empty() || !self.business_name.trim().is_empty()
    }

    /// Name printed on the receipt.
    pub fn display_name(&self) -> String {
        if !self.business_name.trim().is_empty() {
            return self.business_name.trim().to_string();
        }
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Full validation run before an order is built.
    pub fn validate(&self) -> CoreResult<()> {
        if self.document_type_id.is_none() {
            return Err(crate::ValidationError::Required {
                field: "document type".to_string(),
            }
            .into());
        }
        validate_document_number(&self.document_number)?;

        if self.business_name.trim().is_empty() {
            validate_customer_name("first name", &self.first_name)?;
        } else {
            validate_customer_name("business name", &self.business_name)?;
        }

        Ok(())
    }
}
