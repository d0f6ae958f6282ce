use anyhow::anyhow;
use forum_sync::application_impl::*;
use forum_sync::application_port::*;
use forum_sync::domain_model::*;
use forum_sync::domain_port::*;
use forum_sync::infra_http::*;
use forum_sync::infra_store::*;
use forum_sync::infra_ws::*;
use forum_sync::logger::*;
use forum_sync::settings::*;
use forum_sync::sync::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
        quiet_transports: project_settings.log.quiet_transports,
    };
    logger.reload_from_config(&logger_config)?;

    let store = open_session_store(&project_settings.session).await?;
    let auth_http = HttpClient::new(
        &project_settings.auth.base_url,
        request_timeout(&project_settings),
    )?;
    let sessions = RealSessionService::new(store, Arc::new(HttpAuthGateway::new(auth_http)));

    match cli.command.unwrap_or(Command::Run { post: None }) {
        Command::Login { username, password } => {
            let session = sessions.login(&username, &password).await?;
            println!("logged in as {} ({})", session.username, session.role);
        }
        Command::Register {
            username,
            password,
            role,
        } => {
            sessions.register(&username, &password, &role).await?;
            println!("registered {username}, now run `forum-sync login`");
        }
        Command::Logout => {
            sessions.logout().await?;
            println!("logged out");
        }
        Command::Run { post } => {
            let session = sessions.current().await?;
            let scope = post.map_or(ListScope::Posts, |id| ListScope::Comments(PostId(id)));
            run(&project_settings, session, scope).await?;
        }
    }

    Ok(())
}

async fn open_session_store(settings: &SessionStorage) -> anyhow::Result<Arc<dyn SessionStore>> {
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(MemorySessionStore::new())),
        "file" => {
            let path = settings
                .path
                .clone()
                .ok_or_else(|| anyhow!("session.path is required for the file backend"))?;
            Ok(Arc::new(FileSessionStore::open(path).await?))
        }
        other => Err(anyhow!("unknown session backend {other:?}")),
    }
}

fn request_timeout(settings: &Settings) -> Duration {
    Duration::from_millis(settings.forum.request_timeout_ms)
}

// region interactive client

/// A list entry the terminal knows how to print and delete.
trait Listed: Clone + Send + Sync + 'static {
    fn key(&self) -> i64;
    fn author(&self) -> UserId;
    fn line(&self) -> String;
}

impl Listed for Post {
    fn key(&self) -> i64 {
        self.id.0
    }

    fn author(&self) -> UserId {
        self.author_id
    }

    fn line(&self) -> String {
        format!(
            "#{} {} by {}: {}",
            self.id,
            self.title,
            display_name(&self.username),
            self.content
        )
    }
}

impl Listed for Comment {
    fn key(&self) -> i64 {
        self.id.0
    }

    fn author(&self) -> UserId {
        self.author_id
    }

    fn line(&self) -> String {
        format!("#{} {}: {}", self.id, display_name(&self.username), self.content)
    }
}

fn display_name(username: &str) -> &str {
    if username.is_empty() { UNKNOWN_USERNAME } else { username }
}

async fn run(
    settings: &Settings,
    session: Option<Session>,
    scope: ListScope,
) -> anyhow::Result<()> {
    let identity = Identity::from_session(session.as_ref());
    info!(user_id = %identity.user_id, username = %identity.username, "starting client");

    let chat = ChatSync::spawn(
        Arc::new(WsChatConnector::new(settings.chat.endpoint.clone())),
        ChatConfig {
            reconnect_delay: Duration::from_millis(settings.chat.reconnect_delay_ms),
        },
    );
    chat.connect(identity).await;

    let forum_http = HttpClient::new(&settings.forum.base_url, request_timeout(settings))?;
    let forum = RealForumService::new(Arc::new(HttpForumGateway::new(forum_http.clone())));
    let list_config = ListConfig {
        poll_interval: Duration::from_millis(settings.forum.poll_interval_ms),
    };

    let client = Client {
        chat,
        forum,
        session,
    };
    match scope {
        ListScope::Posts => {
            let limits = PageLimits::new(
                settings.forum.post_limits.clone(),
                settings.forum.default_limit,
            )?;
            let fetcher = HttpPostPages::posts(forum_http);
            let list = ListSync::<Post>::spawn(Arc::new(fetcher), limits, list_config);
            client.drive(list).await
        }
        ListScope::Comments(post_id) => {
            let limits = PageLimits::new(
                settings.forum.comment_limits.clone(),
                settings.forum.default_limit,
            )?;
            let fetcher = HttpCommentPages::comments(forum_http, post_id);
            let list = ListSync::<Comment>::spawn(Arc::new(fetcher), limits, list_config);
            client.drive(list).await
        }
    }
}

struct Client {
    chat: ChatSync,
    forum: RealForumService,
    session: Option<Session>,
}

enum Step {
    Continue,
    Quit,
}

impl Client {
    async fn drive<T: Listed>(self, list: ListSync<T>) -> anyhow::Result<()> {
        let chat_printer = tokio::spawn(print_chat(self.chat.subscribe()));
        let list_printer = tokio::spawn(print_list(list.scope(), list.subscribe()));
        println!("type a chat message, or /help");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = signal::ctrl_c() => break,
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    match self.handle_line(&list, line.trim()).await {
                        Step::Continue => {}
                        Step::Quit => break,
                    }
                }
            }
        }

        list.shutdown().await;
        self.chat.shutdown().await;
        chat_printer.abort();
        list_printer.abort();
        info!("client stopped");
        Ok(())
    }

    async fn handle_line<T: Listed>(&self, list: &ListSync<T>, line: &str) -> Step {
        let (command, arg) = match line.strip_prefix('/') {
            Some(rest) => rest.split_once(' ').unwrap_or((rest, "")),
            None => {
                match self.chat.send(line).await {
                    SendOutcome::Sent(_) => {}
                    SendOutcome::TransmitFailed(id) => {
                        println!("! message {id} was not delivered")
                    }
                    SendOutcome::Ignored(IgnoreReason::EmptyMessage) => {}
                    SendOutcome::Ignored(IgnoreReason::NotConnected) => {
                        println!("! chat is not connected")
                    }
                    SendOutcome::Ignored(IgnoreReason::NotAuthenticated) => {
                        println!("! log in to chat")
                    }
                }
                return Step::Continue;
            }
        };
        let arg = arg.trim();

        match command {
            "quit" | "q" => return Step::Quit,
            "help" => print_help(list.limits()),
            "refresh" => report_refresh(list.refresh().await),
            "first" => report_refresh(list.first_page().await),
            "prev" => report_refresh(list.prev_page().await),
            "next" => report_refresh(list.next_page().await),
            "last" => report_refresh(list.last_page().await),
            "page" => match arg.parse::<u64>() {
                Ok(page) => report_refresh(list.set_page(page).await),
                Err(_) => println!("! usage: /page N"),
            },
            "limit" => match arg.parse::<u32>() {
                Ok(limit) => match list.set_limit(limit).await {
                    Ok(outcome) => report_refresh(outcome),
                    Err(e) => println!("! {e}"),
                },
                Err(_) => println!("! usage: /limit N"),
            },
            "post" => self.create_post(list, arg).await,
            "edit" => self.edit_post(list, arg).await,
            "comment" => self.create_comment(list, arg).await,
            "delete" => self.delete(list, arg).await,
            other => println!("! unknown command /{other}"),
        }
        Step::Continue
    }

    async fn create_post<T: Listed>(&self, list: &ListSync<T>, arg: &str) {
        let Some(draft) = parse_post_draft(arg) else {
            println!("! usage: /post TITLE | CONTENT");
            return;
        };
        match self.forum.create_post(self.session.as_ref(), draft).await {
            Ok(post) => {
                println!("created post #{}", post.id);
                report_refresh(list.reload().await);
            }
            Err(e) => println!("! {e}"),
        }
    }

    async fn edit_post<T: Listed>(&self, list: &ListSync<T>, arg: &str) {
        let parsed = arg
            .split_once(' ')
            .and_then(|(id, rest)| Some((id.parse::<i64>().ok()?, parse_post_draft(rest)?)));
        let Some((id, draft)) = parsed else {
            println!("! usage: /edit ID TITLE | CONTENT");
            return;
        };
        match self.forum.update_post(self.session.as_ref(), PostId(id), draft).await {
            Ok(post) => {
                println!("updated post #{}", post.id);
                report_refresh(list.reload().await);
            }
            Err(e) => println!("! {e}"),
        }
    }

    async fn create_comment<T: Listed>(&self, list: &ListSync<T>, arg: &str) {
        let ListScope::Comments(post_id) = list.scope() else {
            println!("! comments can be added with `run --post ID`");
            return;
        };
        let draft = CommentDraft {
            content: arg.to_owned(),
        };
        match self.forum.create_comment(self.session.as_ref(), post_id, draft).await {
            Ok(comment) => {
                println!("added comment #{}", comment.id);
                report_refresh(list.reload().await);
            }
            Err(e) => println!("! {e}"),
        }
    }

    async fn delete<T: Listed>(&self, list: &ListSync<T>, arg: &str) {
        let Ok(id) = arg.parse::<i64>() else {
            println!("! usage: /delete ID");
            return;
        };
        let listed = list.snapshot().items.into_iter().find(|item| item.key() == id);
        if let (Some(item), Some(session)) = (listed, self.session.as_ref()) {
            if !session.can_modify(item.author()) {
                println!("! you can only delete your own entries");
                return;
            }
        }

        let result = match list.scope() {
            ListScope::Posts => self.forum.delete_post(self.session.as_ref(), PostId(id)).await,
            ListScope::Comments(_) => {
                self.forum
                    .delete_comment(self.session.as_ref(), CommentId(id))
                    .await
            }
        };
        match result {
            Ok(()) => {
                println!("deleted #{id}");
                report_refresh(list.reload().await);
            }
            Err(e) => println!("! {e}"),
        }
    }
}

fn parse_post_draft(arg: &str) -> Option<PostDraft> {
    let (title, content) = arg.split_once('|')?;
    Some(PostDraft {
        title: title.trim().to_owned(),
        content: content.trim().to_owned(),
    })
}

fn report_refresh(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Applied | RefreshOutcome::Superseded => {}
        RefreshOutcome::Skipped => println!("(already loading)"),
        RefreshOutcome::Failed(e) => println!("! {e}"),
    }
}

fn print_help(limits: &PageLimits) {
    println!("  TEXT                    send a chat message");
    println!("  /refresh                reload the current page");
    println!("  /first /prev /next /last");
    println!("  /page N                 jump to page N");
    println!("  /limit N                page size, one of {:?}", limits.allowed());
    println!("  /post TITLE | CONTENT   create a post");
    println!("  /edit ID TITLE | CONTENT");
    println!("  /comment TEXT           comment on the open post");
    println!("  /delete ID              delete a post or comment");
    println!("  /quit");
}

async fn print_chat(mut snapshots: tokio::sync::watch::Receiver<ChatSnapshot>) {
    let mut shown = 0;
    let mut connection = ConnectionState::Closed;
    loop {
        {
            let snapshot = snapshots.borrow_and_update();
            if snapshot.connection != connection {
                connection = snapshot.connection;
                println!("[chat {connection}]");
            }
            for message in snapshot.messages.iter().skip(shown) {
                println!(
                    "[{}] {}: {}",
                    message.timestamp.format("%H:%M:%S"),
                    message.username,
                    message.content
                );
            }
            shown = snapshot.messages.len();
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

async fn print_list<T: Listed>(
    scope: ListScope,
    mut snapshots: tokio::sync::watch::Receiver<ListSnapshot<T>>,
) {
    let mut last: Option<(Vec<String>, PaginationState, Option<RemoteError>)> = None;
    loop {
        let (loading, current) = {
            let snapshot = snapshots.borrow_and_update();
            let current = (
                snapshot.items.iter().map(Listed::line).collect::<Vec<_>>(),
                snapshot.pagination,
                snapshot.error.clone(),
            );
            (snapshot.loading, current)
        };
        if !loading && last.as_ref() != Some(&current) {
            let (lines, pagination, error) = &current;
            let prev = if pagination.has_prev() { " /prev" } else { "" };
            let next = if pagination.has_next() { " /next" } else { "" };
            println!(
                "--- {scope}, page {}/{} ({} total, {} per page){prev}{next}",
                pagination.page,
                pagination.last_page(),
                pagination.total,
                pagination.limit
            );
            for line in lines {
                println!("  {line}");
            }
            if let Some(e) = error {
                println!("  ! showing cached data: {e}");
            }
            last = Some(current);
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

// endregion
