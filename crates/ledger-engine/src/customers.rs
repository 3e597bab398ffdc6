//! # Customer Directory
//!
//! Registering, editing and removing customers. Credit lives in
//! [`CreditLedger`](crate::CreditLedger).

use std::sync::Arc;

use ledger_core::validation::{validate_email, validate_id, validate_name};
use ledger_core::{col, Customer, Money, DATE_FORMAT};
use ledger_db::Workbook;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::EngineResult;

/// Editable customer fields. Every field is written as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub notes: String,
}

#[derive(Clone)]
pub struct CustomerDirectory {
    workbook: Workbook,
    clock: Arc<dyn Clock>,
}

impl CustomerDirectory {
    pub fn new(workbook: Workbook, clock: Arc<dyn Clock>) -> Self {
        CustomerDirectory { workbook, clock }
    }

    pub async fn list(&self) -> EngineResult<Vec<Customer>> {
        Ok(self.workbook.customers().list().await?)
    }

    pub async fn get(&self, customer_id: &str) -> EngineResult<Customer> {
        Ok(self.workbook.customers().get(customer_id).await?)
    }

    /// Registers a customer with zero credit, joined today.
    ///
    /// Ids are `C-` followed by five hex characters. A collision with an
    /// existing id draws again.
    pub async fn add_customer(&self, name: &str, email: &str) -> EngineResult<Customer> {
        validate_name("name", name)?;
        validate_email(email)?;

        let repo = self.workbook.customers();
        let mut customer_id = new_customer_id();
        while repo.probe(&customer_id).await?.is_some() {
            debug!(customer_id = %customer_id, "Customer id taken, drawing again");
            customer_id = new_customer_id();
        }

        let customer = Customer {
            customer_id,
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            phone: String::new(),
            joined: self.clock.today().format(DATE_FORMAT).to_string(),
            address: String::new(),
            notes: String::new(),
            credit: Money::zero(),
        };
        repo.insert(&customer).await?;

        info!(customer_id = %customer.customer_id, name = %customer.name, "Customer added");
        Ok(customer)
    }

    /// Overwrites name, phone, address and notes. Columns missing from the
    /// sheet are skipped.
    pub async fn update_customer_details(
        &self,
        customer_id: &str,
        details: &CustomerDetails,
    ) -> EngineResult<()> {
        validate_id("customer", customer_id)?;
        validate_name("name", &details.name)?;

        let handle = self.workbook.customers().locate(customer_id).await?;
        let fields = [
            (col::NAME, details.name.trim()),
            (col::PHONE, details.phone.trim()),
            (col::ADDRESS, details.address.trim()),
            (col::NOTES, details.notes.trim()),
        ];
        for (column, value) in fields {
            self.workbook.write_field(&handle, column, value).await?;
        }

        info!(customer_id, "Customer details updated");
        Ok(())
    }

    /// Removes the customer row. Their invoices are left as they are.
    pub async fn delete_customer(&self, customer_id: &str) -> EngineResult<()> {
        self.workbook.customers().delete(customer_id).await?;
        info!(customer_id, "Customer deleted");
        Ok(())
    }
}

impl std::fmt::Debug for CustomerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomerDirectory")
            .field("workbook", &self.workbook)
            .finish_non_exhaustive()
    }
}

fn new_customer_id() -> String {
    format!("C-{}", &Uuid::new_v4().simple().to_string()[..5])
}
