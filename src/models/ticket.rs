use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::utils::error::AppError;

/// One admission unit. Numbers are unique per event and assigned as a
/// consecutive block at booking time.
#[allow(dead_code)]
#[derive(Debug, Clone, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub booking_id: i64,
    pub event_id: Uuid,
    pub ticket_number: i32,
}

impl Ticket {
    /// Ticket numbers grouped by booking, each group in ascending order.
    pub async fn numbers_by_booking(
        pool: &PgPool,
        booking_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<i32>>, AppError> {
        if booking_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, Ticket>(
            "SELECT id, booking_id, event_id, ticket_number FROM tickets \
             WHERE booking_id = ANY($1) ORDER BY ticket_number",
        )
        .bind(booking_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<i32>> = HashMap::new();
        for ticket in rows {
            grouped
                .entry(ticket.booking_id)
                .or_default()
                .push(ticket.ticket_number);
        }
        Ok(grouped)
    }
}

/// Comma-joined ticket labels for a booking, e.g. `"S4, S5"` for tickets 4
/// and 5 of an event titled "Summer Fest".
pub fn join_labels(event_letter: char, numbers: &[i32]) -> String {
    numbers
        .iter()
        .map(|n| format!("{}{}", event_letter, n))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_comma_joined() {
        assert_eq!(join_labels('S', &[4, 5, 6]), "S4, S5, S6");
    }

    #[test]
    fn single_label_has_no_separator() {
        assert_eq!(join_labels('E', &[1]), "E1");
    }

    #[test]
    fn no_tickets_yields_an_empty_string() {
        assert_eq!(join_labels('S', &[]), "");
    }
}
