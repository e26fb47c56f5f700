// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// Duty sessions are keyed app-side with UUIDv7 so that ids sort in
// clock-in order. Users keep PG's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
