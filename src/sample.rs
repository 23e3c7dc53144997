//! Built-in default data served whenever real storage cannot be reached.

use crate::entity::{Author, Club, Event, NewsArticle, Organizer};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Types that have a non-empty built-in default list.
pub trait Defaults: Sized {
    fn defaults() -> Vec<Self>;
}

fn club(id: &str, name: &str, category: &str, description: &str, now: DateTime<Utc>) -> Club {
    Club {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        description: Some(description.to_string()),
        members: Vec::new(),
        image: None,
        created_at: Some(now),
    }
}

impl Defaults for Club {
    fn defaults() -> Vec<Self> {
        let now = Utc::now();
        vec![
            club(
                "1",
                "Robotics Club",
                "Technology",
                "Building robots and exploring automation technology. Join us to create the future!",
                now,
            ),
            club(
                "2",
                "Drama Society",
                "Arts",
                "Theater performances and acting workshops. Express yourself through the performing arts!",
                now,
            ),
            club(
                "3",
                "Basketball Club",
                "Sports",
                "Competitive basketball and training sessions. Shoot for the stars!",
                now,
            ),
            club(
                "4",
                "Book Club",
                "Academic",
                "Exploring literature and sharing book reviews. Feed your mind with great stories!",
                now,
            ),
            club(
                "5",
                "Art Society",
                "Arts",
                "Painting, drawing, and creative expression. Let your creativity flow!",
                now,
            ),
            club(
                "6",
                "Environmental Club",
                "Service",
                "Making campus greener and more sustainable. Protect our planet together!",
                now,
            ),
        ]
    }
}

fn event(id: &str, title: &str, (y, m, d): (i32, u32, u32), description: &str, organizer: (&str, &str)) -> Event {
    Event {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        date: Utc
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
        image: None,
        organizer: Some(Organizer {
            id: Some(organizer.0.to_string()),
            name: organizer.1.to_string(),
        }),
        attendees: Vec::new(),
    }
}

impl Defaults for Event {
    fn defaults() -> Vec<Self> {
        vec![
            event(
                "1",
                "Robot Competition",
                (2025, 9, 25),
                "Annual robotics competition",
                ("1", "Robotics Club"),
            ),
            event(
                "2",
                "Annual Drama Performance",
                (2025, 9, 28),
                "End of year theater show",
                ("2", "Drama Society"),
            ),
            event(
                "3",
                "Basketball Tournament",
                (2025, 10, 1),
                "Inter-college basketball tournament",
                ("3", "Basketball Club"),
            ),
            event(
                "4",
                "Hackathon 2025",
                (2025, 10, 5),
                "48-hour coding competition",
                ("4", "Coding Club"),
            ),
        ]
    }
}

impl Defaults for NewsArticle {
    fn defaults() -> Vec<Self> {
        let now = Utc::now();
        let article = |id: &str, title: &str, content: &str, author: &str, category: &str, age_days| NewsArticle {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            author: Author {
                id: None,
                name: author.to_string(),
            },
            category: category.to_string(),
            date: now - Duration::days(age_days),
            image: None,
        };
        vec![
            article(
                "1",
                "Welcome to CLUBBEE Campus!",
                "Discover amazing clubs, connect with fellow students, and elevate your campus experience. Join clubs that match your interests and make lasting connections.",
                "CLUBBEE Team",
                "announcement",
                0,
            ),
            article(
                "2",
                "Spring Club Fair Next Week",
                "Join us for the biggest club fair of the semester! Meet representatives from over 50 student organizations and find your perfect fit.",
                "Student Activities",
                "event",
                1,
            ),
            article(
                "3",
                "Club Achievement Awards",
                "Congratulations to all clubs that participated in this semester's activities! Awards ceremony will be held next Friday in the main auditorium.",
                "Dean of Students",
                "achievement",
                2,
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn defaults_are_non_empty_with_unique_ids() {
        let clubs = Club::defaults();
        let events = Event::defaults();
        let news = NewsArticle::defaults();
        assert!(!clubs.is_empty() && !events.is_empty() && !news.is_empty());

        let ids: HashSet<_> = clubs.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), clubs.len());
        assert!(clubs.iter().any(|c| c.name.contains("Robotics Club")));
        assert!(clubs.iter().all(|c| c.members.is_empty()));
    }

    #[test]
    fn news_is_newest_first() {
        let news = NewsArticle::defaults();
        assert!(news.windows(2).all(|w| w[0].date >= w[1].date));
    }
}
