use mongodb::{Database, IndexModel, bson::doc, options::IndexOptions};

use crate::error::Result;

pub async fn ensure_indexes(db: &Database) -> Result<()> {
    // prices: history lookups by url, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("prices");
        let model = IndexModel::builder()
            .keys(doc! { "url": 1, "timestamp": -1 })
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: at most one active alert per url
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "url": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "isActive": true })
                    .build(),
            )
            .build();

        col.create_index(model, None).await?;
    }

    // alerts: retention scan over inactive rows
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "isActive": 1, "updatedAt": 1 })
            .build();

        col.create_index(model, None).await?;
    }

    Ok(())
}
