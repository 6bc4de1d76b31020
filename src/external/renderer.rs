//! Ticket Rendering
//!
//! Turns a ticket into display metadata. The lottery only checks, at
//! initialisation, that the renderer advertises [`TICKET_RENDERER_CAPABILITY`].

use serde::Serialize;

use crate::game::state::TokenId;

/// Capability tag a renderer must advertise.
pub const TICKET_RENDERER_CAPABILITY: &str = "lotto.ticket-renderer.v1";

/// Display rendering for tickets.
pub trait TicketRenderer: Send + Sync {
    /// Whether the renderer implements `capability`.
    fn supports(&self, capability: &str) -> bool;

    /// Render a ticket to a display string.
    fn render(&self, name: &str, token_id: TokenId, max_ball_value: u8, picks: &[u8]) -> String;
}

#[derive(Serialize)]
struct TicketMetadata<'a> {
    name: String,
    description: String,
    picks: &'a [u8],
    max_ball_value: u8,
}

/// Renders tickets as JSON metadata.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTicketRenderer;

impl TicketRenderer for JsonTicketRenderer {
    fn supports(&self, capability: &str) -> bool {
        capability == TICKET_RENDERER_CAPABILITY
    }

    fn render(&self, name: &str, token_id: TokenId, max_ball_value: u8, picks: &[u8]) -> String {
        let balls: Vec<String> = picks.iter().map(|b| b.to_string()).collect();
        let metadata = TicketMetadata {
            name: format!("{} #{}", name, token_id),
            description: format!("{} ticket: {}", name, balls.join(" ")),
            picks,
            max_ball_value,
        };
        // Serializing plain strings and integers cannot fail.
        serde_json::to_string(&metadata).unwrap_or_default()
    }
}

// =============================================================================
// TESTS
// =============================================================================
