//! Object-id convention: a signed integer tag where the library reserves a
//! small negative range and users own everything from 0 up. Grounded on
//! `ecu/object_id.h`.

/// Signed, at least 16-bit per §6. Negative values below
/// [`ObjectId::VALID_BEGIN`] are reserved for the library; `UNUSED` and
/// `RESERVED` are the only two currently defined.
pub type ObjectId = i16;

/// Sentinel meaning "no user tag assigned". Pass this to a constructor when
/// the id mechanism is unused.
pub const UNUSED: ObjectId = -1;

/// Library-internal marker distinct from [`UNUSED`]; used on list-head and
/// tree-root dummy nodes. Never a legal argument to a constructor.
pub const RESERVED: ObjectId = -2;

/// Extension point: future reserved ids are added below this line without
/// breaking users, exactly as `ECU_VALID_OBJECT_ID_BEGIN` documents. Users
/// may only pass ids `>= VALID_BEGIN`.
pub const VALID_BEGIN: ObjectId = UNUSED;

/// Start of the user-defined id range; always 0.
pub const USER_BEGIN: ObjectId = 0;

/// Returns true for any id a user may legally pass to a constructor
/// (`UNUSED` or any value `>= USER_BEGIN`; `RESERVED` is excluded).
pub(crate) fn is_user_assignable(id: ObjectId) -> bool {
    id >= VALID_BEGIN && id != RESERVED
}
