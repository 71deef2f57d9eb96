//! Issue assembler.
//!
//! Collects classified articles into per-book buckets as they arrive, then
//! fixes book order and article order once at [`IssueAssembler::finish`].

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{debug, instrument};

use broadsheet_shared::{Book, BooksConfig, EditionKind, Issue};

use crate::classify::ClassifiedArticle;

/// Book order for one day's paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookOrder {
    /// Books placed first, in this order, when present.
    pub start: Vec<String>,
    /// Book placed last when present.
    pub trailing: String,
}

impl BookOrder {
    /// Pick the start sequence and trailing book for `date`.
    pub fn for_date(date: NaiveDate, books: &BooksConfig) -> Self {
        match (EditionKind::for_date(date), date.weekday()) {
            (EditionKind::Secondary, _) => Self {
                start: books.sunday.clone(),
                trailing: books.secondary_trailing.clone(),
            },
            (EditionKind::Standard, Weekday::Sat) => Self {
                start: books.saturday.clone(),
                trailing: books.standard_trailing.clone(),
            },
            (EditionKind::Standard, _) => Self {
                start: books.weekday.clone(),
                trailing: books.standard_trailing.clone(),
            },
        }
    }
}

/// The in-progress issue for one run.
#[derive(Debug)]
pub struct IssueAssembler {
    date: NaiveDate,
    kind: EditionKind,
    paper_name: String,
    max_words: u64,
    /// Books in first-seen order.
    books: Vec<Book>,
    index: HashMap<String, usize>,
}

impl IssueAssembler {
    pub fn new(date: NaiveDate, kind: EditionKind, paper_name: impl Into<String>) -> Self {
        Self {
            date,
            kind,
            paper_name: paper_name.into(),
            max_words: 0,
            books: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add an article, creating its book on first sight.
    pub fn add(&mut self, classified: ClassifiedArticle) {
        let ClassifiedArticle { article, book } = classified;
        self.max_words = self.max_words.max(article.word_count);

        match self.index.get(&book.id) {
            Some(&i) => self.books[i].articles.push(article),
            None => {
                debug!(book = %book.id, "new book");
                self.index.insert(book.id.clone(), self.books.len());
                self.books.push(Book {
                    meta: book,
                    articles: vec![article],
                });
            }
        }
    }

    /// Largest word count seen so far.
    pub fn max_words(&self) -> u64 {
        self.max_words
    }

    pub fn article_count(&self) -> usize {
        self.books.iter().map(|b| b.articles.len()).sum()
    }

    /// Order books and articles and produce the finished issue.
    ///
    /// Start-sequence books come first in sequence order, the trailing book
    /// comes last, and everything else keeps first-seen order in between.
    /// Articles are sorted by page number; ties keep arrival order.
    #[instrument(skip_all, fields(date = %self.date, books = self.books.len()))]
    pub fn finish(self, order: &BookOrder) -> Issue {
        let index = self.index;
        let mut remaining: Vec<Option<Book>> = self.books.into_iter().map(Some).collect();
        let mut take = |id: &str| -> Option<Book> {
            let &i = index.get(id)?;
            remaining[i].take()
        };

        let mut ordered = Vec::with_capacity(index.len());
        for id in &order.start {
            ordered.extend(take(id.as_str()));
        }
        let trailing = take(order.trailing.as_str());

        ordered.extend(remaining.into_iter().flatten());
        ordered.extend(trailing);

        for book in &mut ordered {
            book.articles.sort_by_key(|a| a.page_number);
        }

        debug!(
            order = ?ordered.iter().map(Book::id).collect::<Vec<_>>(),
            "book order fixed"
        );

        Issue {
            date: self.date,
            kind: self.kind,
            paper_name: self.paper_name,
            max_words: self.max_words,
            books: ordered,
        }
    }
}
