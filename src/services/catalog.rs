use crate::{
    entities::flower::{self, FlowerCategory},
    entities::Flower,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Catalog service: shopper-facing reads plus admin CRUD over flowers.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

/// Input for creating a flower
#[derive(Debug, Deserialize)]
pub struct CreateFlowerInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
    pub category: FlowerCategory,
}

/// Input for updating a flower. Updates replace every editable field, the
/// same shape the admin form submits.
#[derive(Debug, Deserialize)]
pub struct UpdateFlowerInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image: Option<String>,
    pub category: FlowerCategory,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Lists the whole catalog, newest first.
    pub async fn list_flowers(&self) -> Result<Vec<flower::Model>, ServiceError> {
        Ok(Flower::find()
            .order_by_desc(flower::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_flower(&self, flower_id: Uuid) -> Result<flower::Model, ServiceError> {
        Flower::find_by_id(flower_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Flower {} not found", flower_id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_flower(
        &self,
        input: CreateFlowerInput,
    ) -> Result<flower::Model, ServiceError> {
        validate_flower_fields(&input.name, input.price, input.stock)?;

        let now = Utc::now();
        let model = flower::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            image: Set(input.image),
            category: Set(input.category),
            stock: Set(input.stock),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::FlowerCreated(created.id))
            .await;

        info!(flower_id = %created.id, "Flower created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_flower(
        &self,
        flower_id: Uuid,
        input: UpdateFlowerInput,
    ) -> Result<flower::Model, ServiceError> {
        validate_flower_fields(&input.name, input.price, input.stock)?;

        let existing = self.get_flower(flower_id).await?;

        let mut model: flower::ActiveModel = existing.into();
        model.name = Set(input.name);
        model.description = Set(input.description);
        model.price = Set(input.price);
        model.image = Set(input.image);
        model.category = Set(input.category);
        model.stock = Set(input.stock);
        model.updated_at = Set(Utc::now());

        let updated = model.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::FlowerUpdated(flower_id))
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_flower(&self, flower_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_flower(flower_id).await?;
        existing.delete(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::FlowerDeleted(flower_id))
            .await;

        info!(flower_id = %flower_id, "Flower deleted");
        Ok(())
    }
}

fn validate_flower_fields(name: &str, price: Decimal, stock: i32) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "Flower name is required".to_string(),
        ));
    }
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price must not be negative".to_string(),
        ));
    }
    if stock < 0 {
        return Err(ServiceError::ValidationError(
            "Stock must not be negative".to_string(),
        ));
    }
    Ok(())
}
