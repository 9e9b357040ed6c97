//! Registry of the opaque business entities served by the generic CRUD
//! handlers. One `EntityDef` per record type declares its table, the body
//! fields it accepts wholesale, and the filter/ordering/pagination
//! capabilities its list route offers.

use crate::error::ApiError;

/// Where the entity's temporal field lives, for date-range filters and
/// date ordering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateSource {
    /// The row's own creation timestamp column
    CreatedAt,
    /// A field inside the record body, cast to a timestamp
    Field(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListOrder {
    /// Store order; the entity has no defined temporal field
    Unordered,
    /// Most recently created first
    RecencyDesc,
    /// Ascending by the entity's date field
    DateAsc,
}

#[derive(Debug)]
pub struct EntityDef {
    /// Path segment under /api/
    pub path: &'static str,
    pub table: &'static str,
    /// Body fields accepted on create/update; anything else is rejected
    pub columns: &'static [&'static str],
    /// Case-insensitive substring filters offered on list
    pub contains_filters: &'static [&'static str],
    /// Exact-match filters offered on list
    pub equals_filters: &'static [&'static str],
    /// Temporal field for dataInicio/dataFim range filters
    pub date_filter: Option<DateSource>,
    pub order: ListOrder,
    /// Whether the list route is page/limit paginated
    pub paginated: bool,
}

pub static ENTITIES: &[EntityDef] = &[
    EntityDef {
        path: "tickets",
        table: "tickets",
        columns: &[
            "customerCode",
            "technicianCode",
            "companyCode",
            "subject",
            "description",
            "priority",
            "department",
            "product",
            "assistanceType",
            "status",
            "expectedDate",
            "executedDate",
            "closedDate",
        ],
        contains_filters: &[],
        equals_filters: &["customerCode", "companyCode", "priority", "status", "department"],
        date_filter: Some(DateSource::CreatedAt),
        order: ListOrder::RecencyDesc,
        paginated: false,
    },
    EntityDef {
        path: "schedules",
        table: "schedules",
        columns: &["ticketCode", "date", "time", "status"],
        contains_filters: &["status"],
        equals_filters: &[],
        date_filter: Some(DateSource::Field("date")),
        order: ListOrder::DateAsc,
        paginated: false,
    },
    EntityDef {
        path: "attachments",
        table: "attachments",
        columns: &["ticketCode", "attachment"],
        contains_filters: &[],
        equals_filters: &["ticketCode"],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "evaluations",
        table: "evaluations",
        columns: &["userCode", "rating", "comment"],
        contains_filters: &[],
        equals_filters: &["userCode"],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "settings",
        table: "settings",
        columns: &[
            "brandLogo",
            "brandIcon",
            "primaryColor",
            "buttonColor",
            "menuColor",
            "notificationSound",
            "status",
        ],
        contains_filters: &[],
        equals_filters: &["status"],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "contracts",
        table: "contracts",
        columns: &[
            "companyCode",
            "contractType",
            "contractPeriod",
            "hours",
            "extraHours",
            "description",
            "startDate",
            "endDate",
            "status",
        ],
        contains_filters: &[],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: true,
    },
    EntityDef {
        path: "conversations",
        table: "conversations",
        columns: &["ticketCode", "userCode", "message", "attachments"],
        contains_filters: &[],
        equals_filters: &["ticketCode"],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: true,
    },
    EntityDef {
        path: "departments",
        table: "departments",
        columns: &["name"],
        contains_filters: &["name"],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "companies",
        table: "companies",
        columns: &["name", "taxId", "logo", "addresses"],
        contains_filters: &["name", "taxId", "addresses"],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "roles",
        table: "roles",
        columns: &["name"],
        contains_filters: &["name"],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "notifications",
        table: "notifications",
        columns: &["userCode", "subject", "description", "status"],
        contains_filters: &[],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "pending",
        table: "pending_items",
        columns: &["ticketCode", "reportCode", "description", "status"],
        contains_filters: &[],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "faqs",
        table: "faqs",
        columns: &["question", "answer"],
        contains_filters: &[],
        equals_filters: &[],
        date_filter: None,
        order: ListOrder::Unordered,
        paginated: false,
    },
    EntityDef {
        path: "reports",
        table: "reports",
        columns: &[
            "ticketCode",
            "resolution",
            "startTime",
            "endTime",
            "sqlVersion",
            "instance",
            "server",
            "workstations",
            "serverAntivirus",
            "workstationAntivirus",
            "externalBackup",
            "customerResolution",
            "assistantTechnician",
            "approval",
            "approvalDate",
        ],
        contains_filters: &[],
        equals_filters: &["ticketCode"],
        date_filter: Some(DateSource::CreatedAt),
        order: ListOrder::RecencyDesc,
        paginated: true,
    },
];

/// Resolve a path segment to its entity definition.
pub fn lookup(path: &str) -> Option<&'static EntityDef> {
    ENTITIES.iter().find(|def| def.path == path)
}

/// Parsed page/limit pair. Both must be >= 1; limit defaults to 10.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Result<Self, ApiError> {
        let page = match page {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ApiError::bad_request("Page and limit must be whole numbers."))?,
            None => 1,
        };
        let limit = match limit {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| ApiError::bad_request("Page and limit must be whole numbers."))?,
            None => 10,
        };

        if page < 1 || limit < 1 {
            return Err(ApiError::bad_request(
                "Page and limit must be greater than zero.",
            ));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total == 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_every_registered_entity() {
        assert_eq!(ENTITIES.len(), 14);
        for def in ENTITIES {
            assert_eq!(lookup(def.path).unwrap().table, def.table);
        }
        assert!(lookup("utilizadores").is_none());
        assert!(lookup("users").is_none()); // users are handled by typed routes
    }

    #[test]
    fn pagination_defaults_to_page_one_limit_ten() {
        let p = Pagination::from_params(None, None).unwrap();
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn pagination_rejects_zero_and_garbage() {
        assert!(Pagination::from_params(Some("0"), None).is_err());
        assert!(Pagination::from_params(None, Some("-3")).is_err());
        assert!(Pagination::from_params(Some("two"), None).is_err());
    }

    #[test]
    fn fifteen_records_with_limit_ten_is_two_pages() {
        let p = Pagination::from_params(Some("2"), Some("10")).unwrap();
        assert_eq!(p.offset(), 10);
        assert_eq!(p.total_pages(15), 2);
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
    }
}
