//! Product rating maintenance.
//!
//! A product's rating is always recomputed from the full set of its active
//! reviews, never adjusted incrementally. Running it twice is harmless and
//! concurrent writers converge on a value matching some ordering of their
//! review changes.

use metrics::counter;
use sqlx::SqliteConnection;

use crate::api::metrics::RATING_RECOMPUTATIONS_TOTAL;

/// Mean of `grades` rounded to one decimal place (half away from zero).
/// An empty slice rates `0.0`.
pub fn mean_rating(grades: &[f64]) -> f64 {
    if grades.is_empty() {
        return 0.0;
    }
    let mean = grades.iter().sum::<f64>() / grades.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Recompute and store the rating of `product_id` from its active reviews.
///
/// Run this on the same transaction as the review change so a failure here
/// rolls the review change back too.
pub async fn recompute_rating(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> Result<f64, sqlx::Error> {
    let grades: Vec<f64> =
        sqlx::query_scalar("SELECT grade FROM reviews WHERE product_id = ? AND is_active = 1")
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;

    let rating = mean_rating(&grades);

    sqlx::query("UPDATE products SET rating = ? WHERE id = ?")
        .bind(rating)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    counter!(RATING_RECOMPUTATIONS_TOTAL).increment(1);
    tracing::debug!(
        product_id = product_id,
        reviews = grades.len(),
        rating = rating,
        "Product rating recomputed"
    );

    Ok(rating)
}
