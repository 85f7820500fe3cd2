use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime as BsonDateTime, Document, doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{Result, TrackerError},
    models::{Alert, AlertFields, PriceObservation},
    services::{
        db_init,
        repository::{PriceRecord, Repository},
    },
};

const PRICES: &str = "prices";
const ALERTS: &str = "alerts";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    url: String,
    price: f64,
    product_name: String,
    timestamp: BsonDateTime,
    created_at: BsonDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    url: String,
    product_name: String,
    target_price: f64,
    current_price: f64,
    is_active: bool,
    last_checked: BsonDateTime,
    #[serde(default)]
    notifications_sent: i64,
    created_at: BsonDateTime,
    updated_at: BsonDateTime,
}

fn to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

fn from_bson(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

impl From<PriceDocument> for PriceObservation {
    fn from(d: PriceDocument) -> Self {
        PriceObservation {
            id: d.id.to_hex(),
            url: d.url,
            price: d.price,
            product_name: d.product_name,
            timestamp: from_bson(d.timestamp),
            created_at: from_bson(d.created_at),
        }
    }
}

impl From<AlertDocument> for Alert {
    fn from(d: AlertDocument) -> Self {
        Alert {
            id: d.id.to_hex(),
            url: d.url,
            product_name: d.product_name,
            target_price: d.target_price,
            current_price: d.current_price,
            is_active: d.is_active,
            last_checked: from_bson(d.last_checked),
            notifications_sent: d.notifications_sent,
            created_at: from_bson(d.created_at),
            updated_at: from_bson(d.updated_at),
        }
    }
}

fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| TrackerError::NotFound(format!("alert {id}")))
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Command(c) => c.code == 11000,
        ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == 11000,
        _ => false,
    }
}

fn return_after() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

#[derive(Clone, Debug)]
pub struct MongoRepository {
    db: Database,
}

impl MongoRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Connects, selects the database and makes sure the indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        db_init::ensure_indexes(&db).await?;
        Ok(Self::new(db))
    }

    fn prices(&self) -> Collection<PriceDocument> {
        self.db.collection::<PriceDocument>(PRICES)
    }

    fn alerts(&self) -> Collection<AlertDocument> {
        self.db.collection::<AlertDocument>(ALERTS)
    }

    /// Updates the alert only while it is still active.
    async fn update_active_alert(&self, id: &str, update: Document) -> Result<Option<Alert>> {
        let oid = parse_id(id)?;
        let found = self
            .alerts()
            .find_one_and_update(doc! { "_id": oid, "isActive": true }, update, return_after())
            .await?;

        Ok(found.map(Alert::from))
    }
}

#[async_trait::async_trait]
impl Repository for MongoRepository {
    async fn save_price(&self, record: PriceRecord) -> Result<PriceObservation> {
        let document = PriceDocument {
            id: ObjectId::new(),
            url: record.url,
            price: record.price,
            product_name: record.product_name,
            timestamp: to_bson(record.timestamp),
            created_at: to_bson(Utc::now()),
        };

        self.prices().insert_one(&document, None).await?;

        Ok(document.into())
    }

    async fn recent_prices(&self, url: &str, limit: usize) -> Result<Vec<PriceObservation>> {
        let find_opts = FindOptions::builder()
            .sort(doc! { "timestamp": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let mut cursor = self.prices().find(doc! { "url": url }, find_opts).await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?.into());
        }

        Ok(items)
    }

    async fn find_active_alert(&self, url: &str) -> Result<Option<Alert>> {
        let found = self
            .alerts()
            .find_one(doc! { "url": url, "isActive": true }, None)
            .await?;

        Ok(found.map(Alert::from))
    }

    async fn list_active_alerts(&self) -> Result<Vec<Alert>> {
        let find_opts = FindOptions::builder().sort(doc! { "updatedAt": -1 }).build();

        let mut cursor = self
            .alerts()
            .find(doc! { "isActive": true }, find_opts)
            .await?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?.into());
        }

        Ok(items)
    }

    async fn upsert_active_alert(&self, url: &str, fields: AlertFields) -> Result<Alert> {
        let now = to_bson(Utc::now());
        let filter = doc! { "url": url, "isActive": true };
        let update = doc! {
            "$set": {
                "productName": fields.product_name.as_str(),
                "targetPrice": fields.target_price,
                "currentPrice": fields.current_price,
                "lastChecked": now,
                "isActive": true,
                "updatedAt": now,
            },
            "$setOnInsert": {
                "notificationsSent": 0_i64,
                "createdAt": now,
            }
        };
        let opts = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        // A concurrent upsert may lose the race on the unique partial index;
        // the retry then matches the row the winner inserted.
        let mut attempt = 0;
        let found = loop {
            match self
                .alerts()
                .find_one_and_update(filter.clone(), update.clone(), opts.clone())
                .await
            {
                Ok(found) => break found,
                Err(e) if attempt == 0 && is_duplicate_key(&e) => {
                    warn!(url = %url, "duplicate key on alert upsert, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        found
            .map(Alert::from)
            .ok_or_else(|| TrackerError::Persistence(format!("upsert returned no alert for {url}")))
    }

    async fn deactivate_alert(&self, url: &str) -> Result<Option<Alert>> {
        let found = self
            .alerts()
            .find_one_and_update(
                doc! { "url": url, "isActive": true },
                doc! { "$set": { "isActive": false, "updatedAt": to_bson(Utc::now()) } },
                return_after(),
            )
            .await?;

        Ok(found.map(Alert::from))
    }

    async fn record_check(
        &self,
        alert_id: &str,
        price: f64,
        checked_at: DateTime<Utc>,
    ) -> Result<Option<Alert>> {
        let at = to_bson(checked_at);
        self.update_active_alert(
            alert_id,
            doc! { "$set": { "currentPrice": price, "lastChecked": at, "updatedAt": at } },
        )
        .await
    }

    async fn record_notification(&self, alert_id: &str) -> Result<Option<Alert>> {
        self.update_active_alert(
            alert_id,
            doc! {
                "$inc": { "notificationsSent": 1_i64 },
                "$set": { "updatedAt": to_bson(Utc::now()) },
            },
        )
        .await
    }

    async fn delete_prices_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let res = self
            .prices()
            .delete_many(doc! { "timestamp": { "$lt": to_bson(cutoff) } }, None)
            .await?;

        Ok(res.deleted_count)
    }

    async fn delete_inactive_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let res = self
            .alerts()
            .delete_many(
                doc! { "isActive": false, "updatedAt": { "$lt": to_bson(cutoff) } },
                None,
            )
            .await?;

        Ok(res.deleted_count)
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}
