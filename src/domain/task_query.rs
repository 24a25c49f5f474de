use crate::domain::models::{Priority, Task};
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Category,
}

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" | "createdat" | "created_at" => Some(Self::CreatedAt),
            "due" | "duedate" | "due_date" => Some(Self::DueDate),
            "priority" => Some(Self::Priority),
            "category" => Some(Self::Category),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Conjunctive filters followed by one sort key and a 1-based page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub recurring_only: bool,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            category: None,
            priority: None,
            due_date: None,
            recurring_only: false,
            search: None,
            sort_by: SortField::default(),
            direction: SortDirection::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    /// Matches before pagination.
    pub total: usize,
    pub total_pages: usize,
    pub page: usize,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(category) = self.category.as_deref() {
            if task.category.as_deref() != Some(category) {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(due_date) = self.due_date {
            if task.due_date != Some(due_date) {
                return false;
            }
        }
        if self.recurring_only && !task.is_recurring() {
            return false;
        }
        match self.search.as_deref() {
            Some(needle) => task.matches_search(needle),
            None => true,
        }
    }

    pub fn apply(&self, tasks: &[Task]) -> TaskPage {
        let mut matched = tasks
            .iter()
            .filter(|task| self.matches(task))
            .cloned()
            .collect::<Vec<_>>();
        matched.sort_by(|left, right| self.compare(left, right));

        let page_size = self.page_size.max(1);
        let total = matched.len();
        let total_pages = total.div_ceil(page_size).max(1);
        let page = self.page.clamp(1, total_pages);
        let tasks = matched
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        TaskPage {
            tasks,
            total,
            total_pages,
            page,
        }
    }

    fn compare(&self, left: &Task, right: &Task) -> Ordering {
        // Tasks without a due date stay at the end in either direction.
        if self.sort_by == SortField::DueDate {
            match (left.due_date, right.due_date) {
                (Some(_), None) => return Ordering::Less,
                (None, Some(_)) => return Ordering::Greater,
                _ => {}
            }
        }

        let ordering = match self.sort_by {
            SortField::CreatedAt => left.created_at.cmp(&right.created_at),
            SortField::DueDate => left
                .due_date
                .cmp(&right.due_date)
                .then_with(|| left.due_time.cmp(&right.due_time)),
            SortField::Priority => left.priority.rank().cmp(&right.priority.rank()),
            SortField::Category => left
                .category
                .as_deref()
                .unwrap_or_default()
                .cmp(right.category.as_deref().unwrap_or_default()),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{NewTask, Recurrence};
    use chrono::{DateTime, Duration, Utc};
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn task(id: &str, priority: Priority, due: Option<&str>, minutes_after: i64) -> Task {
        NewTask {
            title: format!("Task {id}"),
            priority,
            due_date: due.map(date),
            ..NewTask::default()
        }
        .into_task(
            id.to_string(),
            fixed_time("2026-03-01T08:00:00Z") + Duration::minutes(minutes_after),
        )
    }

    #[test]
    fn default_query_lists_newest_first() {
        let tasks = vec![
            task("a", Priority::Low, None, 0),
            task("b", Priority::Low, None, 5),
            task("c", Priority::Low, None, 10),
        ];
        let page = TaskQuery::default().apply(&tasks);
        let ids = page.tasks.iter().map(|task| task.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn priority_filter_then_due_date_sort() {
        let tasks = vec![
            task("medium-same-day", Priority::Medium, Some("2026-03-05"), 0),
            task("high-later", Priority::High, Some("2026-03-09"), 1),
            task("high-same-day", Priority::High, Some("2026-03-05"), 2),
            task("low-same-day", Priority::Low, Some("2026-03-05"), 3),
        ];
        let query = TaskQuery {
            priority: Some(Priority::High),
            sort_by: SortField::DueDate,
            direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        let ids = query
            .apply(&tasks)
            .tasks
            .into_iter()
            .map(|task| task.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["high-same-day", "high-later"]);
    }

    #[test]
    fn same_due_date_orders_by_priority_only_when_sorting_by_priority() {
        let tasks = vec![
            task("low", Priority::Low, Some("2026-03-05"), 0),
            task("medium", Priority::Medium, Some("2026-03-05"), 1),
            task("high", Priority::High, Some("2026-03-05"), 2),
        ];

        let by_date = TaskQuery {
            sort_by: SortField::DueDate,
            direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        assert_eq!(by_date.apply(&tasks).tasks[0].id, "low");

        let by_priority = TaskQuery {
            sort_by: SortField::Priority,
            direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        assert_eq!(by_priority.apply(&tasks).tasks[0].id, "high");
    }

    #[test]
    fn undated_tasks_sort_last_in_both_directions() {
        let tasks = vec![
            task("none", Priority::Medium, None, 0),
            task("early", Priority::Medium, Some("2026-03-01"), 1),
            task("late", Priority::Medium, Some("2026-03-09"), 2),
        ];
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let query = TaskQuery {
                sort_by: SortField::DueDate,
                direction,
                ..TaskQuery::default()
            };
            assert_eq!(query.apply(&tasks).tasks[2].id, "none");
        }
    }

    #[test]
    fn recurring_category_and_search_filters_compose() {
        let mut daily = task("daily", Priority::Medium, Some("2026-03-01"), 0);
        daily.recurrence = Some(Recurrence::Daily);
        daily.category = Some("Health".to_string());
        daily.description = Some("Morning stretch".to_string());
        let mut other = task("other", Priority::Medium, None, 1);
        other.category = Some("Health".to_string());

        let query = TaskQuery {
            category: Some("Health".to_string()),
            recurring_only: true,
            search: Some("stretch".to_string()),
            ..TaskQuery::default()
        };
        let page = query.apply(&[daily, other]);
        assert_eq!(page.total, 1);
        assert_eq!(page.tasks[0].id, "daily");
    }

    #[test]
    fn page_past_end_clamps_to_last_page() {
        let tasks = (0..25)
            .map(|index| task(&format!("t{index}"), Priority::Medium, None, index))
            .collect::<Vec<_>>();
        let query = TaskQuery {
            page: 9,
            direction: SortDirection::Asc,
            ..TaskQuery::default()
        };
        let page = query.apply(&tasks);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.tasks.len(), 5);
        assert_eq!(page.tasks[0].id, "t20");
    }

    #[test]
    fn empty_list_still_reports_one_page() {
        let page = TaskQuery::default().apply(&[]);
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.tasks.is_empty());
    }

    proptest! {
        #[test]
        fn pages_partition_the_filtered_list(count in 0usize..60, page_size in 1usize..15) {
            let tasks = (0..count)
                .map(|index| task(&format!("t{index}"), Priority::Medium, None, index as i64))
                .collect::<Vec<_>>();
            let first = TaskQuery { page_size, ..TaskQuery::default() }.apply(&tasks);

            let mut seen = Vec::new();
            for page in 1..=first.total_pages {
                let result = TaskQuery { page, page_size, ..TaskQuery::default() }.apply(&tasks);
                prop_assert!(result.tasks.len() <= page_size);
                seen.extend(result.tasks.into_iter().map(|task| task.id));
            }
            prop_assert_eq!(seen.len(), count);
        }
    }
}
