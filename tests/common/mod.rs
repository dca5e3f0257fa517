#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Utc};

use newsboard::article::{Article, ArticleQuery, Order, SortBy};
use newsboard::comment::{Comment, NewComment};
use newsboard::db::{Store, StoreResult};
use newsboard::topic::Topic;
use newsboard::types::{ApiError, Constraint};
use newsboard::users::models::User;

struct ArticleRow {
    article_id: i32,
    title: String,
    topic: String,
    author: String,
    body: String,
    created_at: NaiveDateTime,
    votes: i32,
}

#[derive(Default)]
struct Tables {
    topics: Vec<Topic>,
    users: Vec<User>,
    articles: Vec<ArticleRow>,
    comments: Vec<Comment>,
    next_comment_id: i32,
}

impl Tables {
    fn comment_count(&self, article_id: i32) -> i64 {
        self.comments
            .iter()
            .filter(|c| c.article_id == article_id)
            .count() as i64
    }

    fn project(&self, row: &ArticleRow) -> Article {
        Article {
            article_id: row.article_id,
            title: row.title.clone(),
            topic: row.topic.clone(),
            author: row.author.clone(),
            body: row.body.clone(),
            created_at: row.created_at,
            votes: row.votes,
            comment_count: self.comment_count(row.article_id),
        }
    }
}

/// Holds each caller until `parties` callers are waiting together. Gives up
/// after a few seconds so a serialized caller fails the test instead of
/// hanging it.
pub struct Rendezvous {
    parties: usize,
    arrived: Mutex<usize>,
    all_here: Condvar,
    timed_out: AtomicBool,
}

impl Rendezvous {
    pub fn new(parties: usize) -> Arc<Rendezvous> {
        Arc::new(Rendezvous {
            parties,
            arrived: Mutex::new(0),
            all_here: Condvar::new(),
            timed_out: AtomicBool::new(false),
        })
    }

    fn arrive(&self) {
        let mut arrived = self.arrived.lock().unwrap();
        *arrived += 1;
        if *arrived >= self.parties {
            self.all_here.notify_all();
            return;
        }
        let (guard, wait) = self
            .all_here
            .wait_timeout_while(arrived, Duration::from_secs(5), |n| *n < self.parties)
            .unwrap();
        drop(guard);
        if wait.timed_out() {
            self.timed_out.store(true, AtomicOrdering::SeqCst);
        }
    }

    /// Whether every party arrived while the others were still waiting.
    pub fn met(&self) -> bool {
        *self.arrived.lock().unwrap() >= self.parties
            && !self.timed_out.load(AtomicOrdering::SeqCst)
    }
}

/// In-memory stand-in for Postgres, seeded with the same rows as
/// `db/setup.sql` and enforcing the same constraints.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    broken: bool,
    topics_delay: Option<Duration>,
    vote_rendezvous: Option<Arc<Rendezvous>>,
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .unwrap()
}

impl MemoryStore {
    pub fn seeded() -> MemoryStore {
        let mut tables = Tables::default();

        for (slug, description) in [
            ("mitch", "The man, the Mitch, the legend"),
            ("cats", "Not dogs"),
            ("paper", "what books are made of"),
        ] {
            tables.topics.push(Topic {
                slug: slug.into(),
                description: description.into(),
            });
        }

        for (username, name) in [
            ("butter_bridge", "jonny"),
            ("icellusedkars", "sam"),
            ("rogersop", "paul"),
            ("lurker", "do_nothing"),
        ] {
            tables.users.push(User {
                username: username.into(),
                name: name.into(),
                avatar_url: format!("https://avatars.example.com/{}.png", username),
            });
        }

        let articles = [
            (
                "Living in the shadow of a great man",
                "mitch",
                "butter_bridge",
                "I find this existence challenging",
                at(2020, 7, 9, 20, 11),
                100,
            ),
            (
                "Sony Vaio; or, The Laptop",
                "mitch",
                "icellusedkars",
                "Call me Mitchell.",
                at(2020, 10, 16, 5, 3),
                0,
            ),
            (
                "Eight pug gifs that remind me of mitch",
                "mitch",
                "icellusedkars",
                "some gifs",
                at(2020, 11, 3, 9, 12),
                0,
            ),
            (
                "UNCOVERED: catspiracy to bring down democracy",
                "cats",
                "rogersop",
                "Bastet walks amongst us",
                at(2020, 8, 3, 13, 14),
                0,
            ),
        ];
        for (i, (title, topic, author, body, created_at, votes)) in
            articles.into_iter().enumerate()
        {
            tables.articles.push(ArticleRow {
                article_id: i as i32 + 1,
                title: title.into(),
                topic: topic.into(),
                author: author.into(),
                body: body.into(),
                created_at,
                votes,
            });
        }

        let comments = [
            (
                1,
                "butter_bridge",
                "Oh, I've got compassion running out of my nose, pal!",
                16,
                at(2020, 4, 6, 12, 17),
            ),
            (
                1,
                "butter_bridge",
                "The beautiful thing about treasure is that it exists.",
                14,
                at(2020, 10, 31, 3, 3),
            ),
            (
                1,
                "icellusedkars",
                "Replacing the quiet elegance of the dark suit and tie.",
                100,
                at(2020, 3, 1, 1, 13),
            ),
            (3, "icellusedkars", "I hate streaming noses", -100, at(2020, 2, 23, 12, 1)),
            (3, "icellusedkars", "I hate streaming eyes even more", 0, at(2020, 6, 20, 7, 24)),
            (4, "lurker", "git push origin main", 0, at(2020, 3, 14, 17, 2)),
        ];
        for (i, (article_id, author, body, votes, created_at)) in
            comments.into_iter().enumerate()
        {
            tables.comments.push(Comment {
                comment_id: i as i32 + 1,
                article_id,
                author: author.into(),
                body: body.into(),
                votes,
                created_at,
            });
        }
        tables.next_comment_id = tables.comments.len() as i32 + 1;

        MemoryStore {
            tables: Mutex::new(tables),
            broken: false,
            topics_delay: None,
            vote_rendezvous: None,
        }
    }

    /// Every topics read takes at least `delay`, like a query stuck on a lock.
    pub fn with_slow_topics(self, delay: Duration) -> MemoryStore {
        MemoryStore {
            topics_delay: Some(delay),
            ..self
        }
    }

    /// Every vote update waits at `rendezvous` before touching the tables.
    pub fn with_vote_rendezvous(self, rendezvous: Arc<Rendezvous>) -> MemoryStore {
        MemoryStore {
            vote_rendezvous: Some(rendezvous),
            ..self
        }
    }

    /// A store whose every call fails the way a lost database would.
    pub fn broken() -> MemoryStore {
        MemoryStore {
            broken: true,
            ..MemoryStore::seeded()
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        if self.broken {
            return Err(ApiError::Unknown("connection refused".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        f(&mut tables)
    }
}

fn compare(sort_by: SortBy, a: &Article, b: &Article) -> Ordering {
    let by_column = match sort_by {
        SortBy::Author => a.author.cmp(&b.author),
        SortBy::Title => a.title.cmp(&b.title),
        SortBy::ArticleId => a.article_id.cmp(&b.article_id),
        SortBy::Topic => a.topic.cmp(&b.topic),
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::Votes => a.votes.cmp(&b.votes),
        SortBy::CommentCount => a.comment_count.cmp(&b.comment_count),
    };
    by_column.then_with(|| a.article_id.cmp(&b.article_id))
}

impl Store for MemoryStore {
    fn topics(&self) -> StoreResult<Vec<Topic>> {
        if let Some(delay) = self.topics_delay {
            thread::sleep(delay);
        }
        self.with(|t| Ok(t.topics.clone()))
    }

    fn topic_exists(&self, slug: &str) -> StoreResult<bool> {
        self.with(|t| Ok(t.topics.iter().any(|topic| topic.slug == slug)))
    }

    fn articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
        self.with(|t| {
            let mut articles: Vec<Article> = t
                .articles
                .iter()
                .filter(|row| query.topic().map_or(true, |topic| row.topic == topic))
                .map(|row| t.project(row))
                .collect();
            articles.sort_by(|a, b| compare(query.sort_by(), a, b));
            if query.order() == Order::Desc {
                articles.reverse();
            }
            Ok(articles)
        })
    }

    fn article(&self, article_id: i32) -> StoreResult<Option<Article>> {
        self.with(|t| {
            Ok(t.articles
                .iter()
                .find(|row| row.article_id == article_id)
                .map(|row| t.project(row)))
        })
    }

    fn article_exists(&self, article_id: i32) -> StoreResult<bool> {
        self.with(|t| Ok(t.articles.iter().any(|row| row.article_id == article_id)))
    }

    fn add_votes(&self, article_id: i32, inc_votes: Option<i32>) -> StoreResult<Option<Article>> {
        if let Some(rendezvous) = &self.vote_rendezvous {
            rendezvous.arrive();
        }
        self.with(|t| {
            let index = match t.articles.iter().position(|row| row.article_id == article_id) {
                Some(index) => index,
                None => return Ok(None),
            };
            let inc_votes =
                inc_votes.ok_or(ApiError::Constraint(Constraint::NotNullViolation))?;
            let row = &mut t.articles[index];
            row.votes = row
                .votes
                .checked_add(inc_votes)
                .ok_or_else(|| ApiError::Unknown("integer out of range".into()))?;
            Ok(Some(t.project(&t.articles[index])))
        })
    }

    fn comments(&self, article_id: i32) -> StoreResult<Vec<Comment>> {
        self.with(|t| {
            let mut comments: Vec<Comment> = t
                .comments
                .iter()
                .filter(|c| c.article_id == article_id)
                .cloned()
                .collect();
            comments.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.comment_id.cmp(&a.comment_id))
            });
            Ok(comments)
        })
    }

    fn insert_comment(&self, comment: &NewComment) -> StoreResult<Comment> {
        self.with(|t| {
            let author = comment
                .author
                .clone()
                .ok_or(ApiError::Constraint(Constraint::NotNullViolation))?;
            let body = comment
                .body
                .clone()
                .ok_or(ApiError::Constraint(Constraint::NotNullViolation))?;
            let article_known = t.articles.iter().any(|a| a.article_id == comment.article_id);
            let author_known = t.users.iter().any(|u| u.username == author);
            if !article_known || !author_known {
                return Err(ApiError::Constraint(Constraint::ForeignKeyViolation));
            }
            let created = Comment {
                comment_id: t.next_comment_id,
                article_id: comment.article_id,
                author,
                body,
                votes: 0,
                created_at: Utc::now().naive_utc(),
            };
            t.next_comment_id += 1;
            t.comments.push(created.clone());
            Ok(created)
        })
    }

    fn delete_comment(&self, comment_id: i32) -> StoreResult<usize> {
        self.with(|t| {
            let before = t.comments.len();
            t.comments.retain(|c| c.comment_id != comment_id);
            Ok(before - t.comments.len())
        })
    }

    fn users(&self) -> StoreResult<Vec<User>> {
        self.with(|t| Ok(t.users.clone()))
    }
}
