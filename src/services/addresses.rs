use crate::{
    entities::shipping_address,
    entities::ShippingAddress,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shipping-address book of a user. Addresses referenced by historical
/// orders are never mutated; the book only grows and shrinks.
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

/// Input for creating a shipping address
#[derive(Debug, Deserialize)]
pub struct CreateAddressInput {
    pub street: String,
    pub city: String,
    pub commune: String,
    pub province: String,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub label: Option<String>,
}

/// Address projection used by the checkout address picker: everything the
/// shopper needs to recognize an address, without postal code or timestamps.
#[derive(Debug, Serialize, ToSchema)]
pub struct AddressLabel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub street: String,
    pub city: String,
    pub commune: String,
    pub province: String,
    pub country: String,
    pub label: Option<String>,
}

impl From<shipping_address::Model> for AddressLabel {
    fn from(model: shipping_address::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            street: model.street,
            city: model.city,
            commune: model.commune,
            province: model.province,
            country: model.country,
            label: model.label,
        }
    }
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<shipping_address::Model>, ServiceError> {
        Ok(ShippingAddress::find()
            .filter(shipping_address::Column::UserId.eq(user_id))
            .order_by_desc(shipping_address::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn labels(&self, user_id: Uuid) -> Result<Vec<AddressLabel>, ServiceError> {
        let addresses = self.list(user_id).await?;
        Ok(addresses.into_iter().map(AddressLabel::from).collect())
    }

    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create(
        &self,
        user_id: Uuid,
        input: CreateAddressInput,
    ) -> Result<shipping_address::Model, ServiceError> {
        for (field, value) in [
            ("street", &input.street),
            ("city", &input.city),
            ("commune", &input.commune),
            ("province", &input.province),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::ValidationError(format!(
                    "{} is required",
                    field
                )));
            }
        }

        let now = Utc::now();
        let model = shipping_address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            street: Set(input.street),
            city: Set(input.city),
            commune: Set(input.commune),
            province: Set(input.province),
            postal_code: Set(input.postal_code),
            country: Set(input.country.unwrap_or_else(|| "Cambodia".to_string())),
            label: Set(input.label),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::AddressCreated(created.id))
            .await;

        info!(address_id = %created.id, "Shipping address created");
        Ok(created)
    }

    /// Deletes an address owned by the user. Deleting somebody else's
    /// address is indistinguishable from deleting a missing one.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: Uuid, address_id: Uuid) -> Result<(), ServiceError> {
        let result = ShippingAddress::delete_many()
            .filter(shipping_address::Column::Id.eq(address_id))
            .filter(shipping_address::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "Shipping address not found".to_string(),
            ));
        }

        self.event_sender
            .send_or_log(Event::AddressDeleted(address_id))
            .await;

        Ok(())
    }
}
