//! Interactive shell driving the view flow.
//!
//! One loop multiplexes operator input with live events from the open detail
//! view; commands never kill the loop, their errors print and the prompt
//! comes back.

use std::future;

use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use uuid::Uuid;

use newsroom_core::{
    domain::{ArticleId, Role, UserId, EMOJI_OPTIONS},
    views::{share_link, Flow, LiveEvent, Target, ViewState},
    Result,
};

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    WhoAmI,
    Home,
    Open(String),
    Comment(String),
    React(String),
    Share,
    Editor,
    New { title: String, content: String },
    Edit { index: usize, title: String, content: String },
    Publish(usize),
    Admin,
    Find(String),
    SetRole { user: i64, role: Role },
    Quit,
}

enum Input {
    Line(Option<String>),
    Event(LiveEvent),
}

pub async fn run(mut flow: Flow, app_url: Option<String>) -> Result<()> {
    println!(
        "signed in as {} ({})",
        flow.viewer().username,
        flow.viewer().role
    );
    println!("type `help` for commands");
    render(&flow);

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        let input = tokio::select! {
            line = lines.next_line() => Input::Line(line?),
            event = pump(flow.state_mut()) => Input::Event(event),
        };

        match input {
            Input::Event(event) => {
                if let ViewState::Detail(view) = flow.state_mut() {
                    view.apply(event).await;
                }
                match event {
                    LiveEvent::Comment(_) => println!("(new comment arrived)"),
                    LiveEvent::Reaction(_) => println!("(reactions updated)"),
                }
            }
            Input::Line(None) => return Ok(()),
            Input::Line(Some(line)) => {
                let cmd = match parse_command(&line) {
                    Ok(Some(cmd)) => cmd,
                    Ok(None) => continue,
                    Err(msg) => {
                        println!("{msg}");
                        continue;
                    }
                };
                if cmd == Command::Quit {
                    return Ok(());
                }
                match dispatch(&mut flow, app_url.as_deref(), cmd).await {
                    Ok(true) => render(&flow),
                    Ok(false) => {}
                    Err(e) => println!("error: {e}"),
                }
            }
        }
    }
}

/// Wait for a live event when a detail view is open; otherwise park forever
/// so the select only wakes on input.
async fn pump(state: &mut ViewState) -> LiveEvent {
    match state {
        ViewState::Detail(view) => match view.next_event().await {
            Some(event) => event,
            None => future::pending().await,
        },
        _ => future::pending().await,
    }
}

/// Run one command. `Ok(true)` asks the caller to re-render the screen.
async fn dispatch(flow: &mut Flow, app_url: Option<&str>, cmd: Command) -> Result<bool> {
    match cmd {
        Command::Quit => Ok(false),
        Command::Help => {
            print_help();
            Ok(false)
        }
        Command::WhoAmI => {
            let v = flow.viewer();
            println!("{} {} @{} ({})", v.first_name, v.last_name, v.username, v.role);
            Ok(false)
        }
        Command::Home => {
            flow.navigate(Target::Home).await?;
            Ok(true)
        }
        Command::Editor => {
            flow.navigate(Target::Editor).await?;
            Ok(true)
        }
        Command::Admin => {
            flow.navigate(Target::Admin).await?;
            Ok(true)
        }
        Command::Open(arg) => {
            let Some(id) = resolve_article(flow, &arg) else {
                println!("nothing matching `{arg}` to open");
                return Ok(false);
            };
            flow.navigate(Target::Article(id)).await?;
            Ok(true)
        }
        Command::Comment(text) => {
            if let ViewState::Detail(view) = flow.state_mut() {
                if view.comment(&text).await? {
                    Ok(true)
                } else {
                    println!("empty comment ignored");
                    Ok(false)
                }
            } else {
                println!("open an article first");
                Ok(false)
            }
        }
        Command::React(arg) => {
            let Some(emoji) = resolve_emoji(&arg) else {
                println!("unknown reaction `{arg}`");
                return Ok(false);
            };
            if let ViewState::Detail(view) = flow.state_mut() {
                view.react(emoji).await?;
                Ok(true)
            } else {
                println!("open an article first");
                Ok(false)
            }
        }
        Command::Share => {
            match (app_url, flow.state()) {
                (Some(url), ViewState::Detail(view)) => {
                    println!("{}", share_link(url, view.article_id()));
                }
                (None, ViewState::Detail(_)) => println!("APP_URL is not configured"),
                _ => println!("open an article first"),
            }
            Ok(false)
        }
        Command::New { title, content } => {
            if let ViewState::Editor(view) = flow.state_mut() {
                match view.create(&title, &content).await? {
                    Some(article) => println!("draft created: {}", article.id),
                    None => println!("title and content are both required"),
                }
                Ok(true)
            } else {
                println!("switch to the editor first");
                Ok(false)
            }
        }
        Command::Edit {
            index,
            title,
            content,
        } => {
            if let ViewState::Editor(view) = flow.state_mut() {
                let Some(id) = view.articles.get(index.wrapping_sub(1)).map(|a| a.id) else {
                    println!("no article #{index}");
                    return Ok(false);
                };
                view.update(id, &title, &content).await?;
                Ok(true)
            } else {
                println!("switch to the editor first");
                Ok(false)
            }
        }
        Command::Publish(index) => {
            if let ViewState::Editor(view) = flow.state_mut() {
                let Some(id) = view.articles.get(index.wrapping_sub(1)).map(|a| a.id) else {
                    println!("no article #{index}");
                    return Ok(false);
                };
                let article = view.publish(id).await?;
                println!("published: {}", article.title);
                Ok(true)
            } else {
                println!("switch to the editor first");
                Ok(false)
            }
        }
        Command::Find(query) => {
            if let ViewState::Admin(view) = flow.state_mut() {
                let hits = view.search(&query).await?;
                if hits.is_empty() {
                    println!("no matches");
                }
                for p in hits {
                    println!("{} @{} ({})", p.id, p.username, p.role);
                }
            } else {
                println!("switch to the admin screen first");
            }
            Ok(false)
        }
        Command::SetRole { user, role } => {
            if let ViewState::Admin(view) = flow.state_mut() {
                let updated = view.assign_role(UserId(user), role).await?;
                println!("@{} is now {}", updated.username, updated.role);
            } else {
                println!("switch to the admin screen first");
            }
            Ok(false)
        }
    }
}

/// An index into the current home page, or a raw article id.
fn resolve_article(flow: &Flow, arg: &str) -> Option<ArticleId> {
    if let Ok(n) = arg.parse::<usize>() {
        if let ViewState::Home(home) = flow.state() {
            return home.articles.get(n.wrapping_sub(1)).map(|s| s.article.id);
        }
        return None;
    }
    Uuid::parse_str(arg).ok().map(ArticleId)
}

/// An index into the fixed emoji bar, or the emoji itself.
fn resolve_emoji(arg: &str) -> Option<&'static str> {
    if let Ok(n) = arg.parse::<usize>() {
        return EMOJI_OPTIONS.get(n.wrapping_sub(1)).copied();
    }
    EMOJI_OPTIONS.iter().find(|e| **e == arg).copied()
}

fn render(flow: &Flow) {
    match flow.state() {
        ViewState::Home(home) => {
            println!("-- home --");
            for (i, s) in home.articles.iter().enumerate() {
                println!(
                    "{:>2}. {}  by @{}  [{} comments, {} reactions]",
                    i + 1,
                    s.article.title,
                    s.author.username,
                    s.comments_count,
                    s.reactions_count
                );
            }
            if home.articles.is_empty() {
                println!("(nothing published yet)");
            }
        }
        ViewState::Detail(view) => {
            println!("-- {} --", view.article.title);
            println!("by @{}", view.author.username);
            println!("{}", view.article.content);
            let bar = EMOJI_OPTIONS
                .iter()
                .map(|e| format!("{e} {}", view.reactions.count(e)))
                .collect::<Vec<_>>()
                .join("  ");
            println!("{bar}");
            if let Some(mine) = &view.reactions.viewer_emoji {
                println!("your reaction: {mine}");
            }
            for c in &view.comments {
                println!("@{}: {}", c.author.username, c.content);
            }
        }
        ViewState::Editor(view) => {
            println!("-- editor --");
            for (i, a) in view.articles.iter().enumerate() {
                let mark = if a.is_published { "published" } else { "draft" };
                println!("{:>2}. [{mark}] {}", i + 1, a.title);
            }
            if view.articles.is_empty() {
                println!("(no articles yet, use `new <title> :: <content>`)");
            }
        }
        ViewState::Admin(_) => {
            println!("-- admin --");
            println!("use `find <id|name>` and `role <id> <user|editor|admin>`");
        }
        ViewState::Denied(screen) => println!("access denied: {screen:?}"),
    }
}

fn print_help() {
    println!("  help                         this text");
    println!("  whoami                       current profile");
    println!("  home                         published feed");
    println!("  open <n|id>                  open an article");
    println!("  comment <text>               comment on the open article");
    println!("  react <1-6|emoji>            toggle a reaction");
    println!("  share                        print the deep link");
    println!("  editor                       your articles (editor/admin)");
    println!("  new <title> :: <content>     create a draft");
    println!("  edit <n> <title> :: <content>");
    println!("  publish <n>                  publish a draft");
    println!("  admin                        user management (admin)");
    println!("  find <id|name>               look up users");
    println!("  role <id> <user|editor|admin>");
    println!("  quit");
}

fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };

    let cmd = match head {
        "help" => Command::Help,
        "whoami" => Command::WhoAmI,
        "home" | "back" | "list" => Command::Home,
        "editor" | "mine" => Command::Editor,
        "admin" => Command::Admin,
        "share" => Command::Share,
        "quit" | "exit" => Command::Quit,
        "open" => match rest {
            "" => return Err("usage: open <number|id>".to_string()),
            arg => Command::Open(arg.to_string()),
        },
        "comment" => match rest {
            "" => return Err("usage: comment <text>".to_string()),
            text => Command::Comment(text.to_string()),
        },
        "react" => match rest {
            "" => return Err("usage: react <1-6|emoji>".to_string()),
            arg => Command::React(arg.to_string()),
        },
        "new" => {
            let Some((title, content)) = rest.split_once("::") else {
                return Err("usage: new <title> :: <content>".to_string());
            };
            Command::New {
                title: title.trim().to_string(),
                content: content.trim().to_string(),
            }
        }
        "edit" => {
            let Some((index, remainder)) = rest.split_once(char::is_whitespace) else {
                return Err("usage: edit <n> <title> :: <content>".to_string());
            };
            let index = index
                .parse::<usize>()
                .map_err(|_| "usage: edit <n> <title> :: <content>".to_string())?;
            let Some((title, content)) = remainder.split_once("::") else {
                return Err("usage: edit <n> <title> :: <content>".to_string());
            };
            Command::Edit {
                index,
                title: title.trim().to_string(),
                content: content.trim().to_string(),
            }
        }
        "publish" => {
            let index = rest
                .parse::<usize>()
                .map_err(|_| "usage: publish <n>".to_string())?;
            Command::Publish(index)
        }
        "find" => match rest {
            "" => return Err("usage: find <id|name>".to_string()),
            query => Command::Find(query.to_string()),
        },
        "role" => {
            let mut parts = rest.split_whitespace();
            let (Some(id), Some(role), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err("usage: role <id> <user|editor|admin>".to_string());
            };
            let user = id
                .parse::<i64>()
                .map_err(|_| format!("`{id}` is not a user id"))?;
            let Some(role) = Role::parse(role) else {
                return Err(format!("`{role}` is not a role"));
            };
            Command::SetRole { user, role }
        }
        other => return Err(format!("unknown command `{other}`, try `help`")),
    };
    Ok(Some(cmd))
}
