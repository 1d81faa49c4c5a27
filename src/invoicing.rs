//! Invoice creation from confirmed offerings.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, RepositoryError, conflict, not_found};
use crate::models::invoice::{self, InvoiceStatus};
use crate::models::offering::OfferingStatus;
use crate::pricing;
use crate::repositories::{
    CommissionRepository, InvoiceRepository, OfferingRepository, RequestRepository,
    SettingRepository,
};

/// `INV-YYYYMMDD-XXXXXXXX`, the suffix taken from the invoice id.
pub fn invoice_number(date: NaiveDate, invoice_id: Uuid) -> String {
    let suffix: String = invoice_id
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("INV-{}-{}", date.format("%Y%m%d"), suffix)
}

pub struct InvoiceService<'a> {
    db: &'a DatabaseConnection,
    fallback_currency: String,
}

impl<'a> InvoiceService<'a> {
    pub fn new(db: &'a DatabaseConnection, fallback_currency: impl Into<String>) -> Self {
        Self {
            db,
            fallback_currency: fallback_currency.into(),
        }
    }

    /// Raises a draft invoice for a confirmed offering. One invoice per offering.
    #[instrument(skip(self))]
    pub async fn create_from_offering(
        &self,
        offering_id: Uuid,
    ) -> Result<invoice::Model, ApiError> {
        let txn = self.db.begin().await?;

        let offering = OfferingRepository::new(&txn)
            .get(offering_id)
            .await?
            .ok_or_else(|| not_found("Offering not found"))?;
        if offering.status != OfferingStatus::Confirmed {
            return Err(conflict("Only confirmed offerings can be invoiced"));
        }
        let amount = offering
            .total_final_price
            .ok_or_else(|| conflict("Offering has no final price"))?;

        let invoices = InvoiceRepository::new(&txn);
        if invoices.find_by_offering(offering.id).await?.is_some() {
            return Err(conflict("Offering has already been invoiced"));
        }

        let request = RequestRepository::new(&txn)
            .get(offering.request_id)
            .await?
            .ok_or_else(|| not_found("Request not found"))?;

        let commission_amount = match CommissionRepository::new(&txn)
            .active_for_workspace(request.workspace_id)
            .await?
        {
            Some(commission) => pricing::percentage_of(amount, commission.rate_percent)?,
            None => 0,
        };
        let currency = SettingRepository::new(&txn)
            .currency(&self.fallback_currency)
            .await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let invoice = invoices
            .insert(invoice::ActiveModel {
                id: Set(id),
                invoice_number: Set(invoice_number(now.date_naive(), id)),
                workspace_id: Set(request.workspace_id),
                request_id: Set(request.id),
                offering_id: Set(offering.id),
                amount: Set(amount),
                commission_amount: Set(commission_amount),
                currency: Set(currency),
                status: Set(InvoiceStatus::Draft),
                issued_at: Set(None),
                paid_at: Set(None),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => conflict("Offering has already been invoiced"),
                other => other.into(),
            })?;

        txn.commit().await?;

        counter!("sakina_invoices_created_total").increment(1);
        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            amount,
            commission_amount,
            "Invoice created"
        );
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_number_format() {
        let id = Uuid::parse_str("3f2a9c10-0000-4000-8000-000000000000").unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(invoice_number(date, id), "INV-20250307-3F2A9C10");
    }
}
