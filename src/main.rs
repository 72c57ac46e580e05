use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Env;
use jiff::Zoned;
use jiff::civil::Date;
use jiff::tz::TimeZone;

use crate::{
    ai::GeminiClient,
    config::Config,
    models::{
        store::Store,
        task::{Frequency, Priority},
    },
    notify::{APP_VERSION, Notice, TerminalNotifier, render_notice},
    services::{
        chat::{self, SendMessageParameters},
        dashboard, employees,
        employees::InviteEmployeeParameters,
        groups::{self, SaveGroupParameters},
        lookup, planner, reminder,
        reports::{self, ReportFilter},
        search, session,
        tasks::{self, AddTaskParameters, SortOption, StatusFilter, TaskFilter},
    },
    storage::{Storage, json::JsonFileStorage},
};

mod ai;
mod config;
mod models;
mod notify;
mod services;
mod storage;
mod ui;

type CommandResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(
    name = "taskflow",
    about = "Team task tracking, chat and compliance planning for your terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show your personal dashboard (default)
    Dashboard,

    /// Show open tasks with due dates, earliest first
    Deadlines,

    /// Search tasks and groups
    Search {
        /// Text to look for in titles and descriptions
        query: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage work groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// Manage the team directory
    #[command(subcommand)]
    Team(TeamCommand),

    /// Team chat
    #[command(subcommand)]
    Chat(ChatCommand),

    /// Sign in, switch and sign out accounts
    #[command(subcommand)]
    Account(AccountCommand),

    /// Yearly report of completed tasks
    Report {
        /// Year to report on (defaults to the current year)
        #[arg(short, long)]
        year: Option<i16>,

        /// Only tasks assigned to this employee
        #[arg(short, long)]
        employee: Option<String>,

        /// Only tasks whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Write the report as CSV (to the given path or the default file name)
        #[arg(long, num_args = 0..=1)]
        export: Option<Option<PathBuf>>,

        /// List the years that have data
        #[arg(long)]
        years: bool,
    },

    /// Generate a month of recurring tasks for a group
    Plan {
        /// Group slug or name
        group: String,
    },

    /// Break a task down into generated subtasks
    Suggest {
        /// Task number or title
        task: String,
    },

    /// Configure or run the hydration reminder
    Remind {
        /// Minutes between reminders
        #[arg(long)]
        every: Option<u32>,

        /// Turn reminders on
        #[arg(long, conflicts_with = "off")]
        on: bool,

        /// Turn reminders off
        #[arg(long)]
        off: bool,

        /// Keep running and send reminders
        #[arg(long)]
        run: bool,

        /// Stop after this many reminders
        #[arg(long, requires = "run")]
        count: Option<u32>,
    },

    /// Print the version
    Version,
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List root tasks
    List {
        /// Group slug or name
        #[arg(short, long)]
        group: Option<String>,

        /// Only tasks assigned to this employee
        #[arg(short, long, conflicts_with = "mine")]
        assignee: Option<String>,

        /// Only tasks assigned to you
        #[arg(short, long)]
        mine: bool,

        #[arg(short, long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,

        #[arg(long, value_enum, default_value_t = SortOption::Manual)]
        sort: SortOption,
    },

    /// Add a new task
    Add {
        /// Task title
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Group slug or name (defaults to the first group)
        #[arg(short, long)]
        group: Option<String>,

        /// Due date, YYYY-MM-DD (defaults to the group's due day)
        #[arg(long)]
        due: Option<String>,

        #[arg(short, long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,

        /// Repeat the task every week or month
        #[arg(long, value_enum)]
        every: Option<Frequency>,

        /// Employee name or email
        #[arg(short, long)]
        assign: Option<String>,
    },

    /// Mark a task as completed, or reopen a completed one
    Done {
        /// Task number or title
        task: String,
    },

    /// Assign a task, or unassign it when no employee is given
    Assign {
        /// Task number or title
        task: String,

        /// Employee name or email
        employee: Option<String>,
    },

    /// Delete a task and its subtasks
    Delete {
        /// Task number or title
        task: String,
    },

    /// Add a subtask
    Sub {
        /// Parent task number or title
        parent: String,

        /// Subtask title
        title: String,
    },

    /// Toggle monthly recurrence
    Recurring {
        /// Task number or title
        task: String,
    },

    /// Show or hide a task's subtasks in listings
    Expand {
        /// Task number or title
        task: String,
    },

    /// Move tasks to the top of the list in the given order
    Reorder {
        /// Task numbers or titles
        #[arg(required = true)]
        tasks: Vec<String>,
    },
}

#[derive(Subcommand)]
enum GroupCommand {
    /// List groups
    List,

    /// Create a group
    New {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Employee name or email (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,

        /// Day of the month new tasks fall due on
        #[arg(long)]
        due_day: Option<u8>,

        /// Work that does not repeat every month
        #[arg(long)]
        one_off: bool,

        /// Hide the group from viewers
        #[arg(long)]
        restricted: bool,
    },

    /// Edit a group; omitted fields keep their values
    Edit {
        /// Group slug or name
        group: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Replace the members (repeatable)
        #[arg(short, long = "member")]
        members: Vec<String>,

        #[arg(long)]
        due_day: Option<u8>,

        #[arg(long)]
        recurring: Option<bool>,

        #[arg(long)]
        restricted: Option<bool>,
    },

    /// Toggle whether viewers can see a group (admin only)
    Restrict {
        /// Group slug or name
        group: String,
    },

    /// Mute or unmute a group's chat for you
    Mute {
        /// Group slug, group name or chat group name
        channel: String,
    },
}

#[derive(Subcommand)]
enum TeamCommand {
    /// List employees
    List,

    /// Invite an employee; the invite is linked when they sign in
    Invite {
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, default_value = "Team Member")]
        role: String,
    },

    /// Remove an employee
    Remove {
        /// Employee name or email
        employee: String,
    },
}

#[derive(Subcommand)]
enum ChatCommand {
    /// List channels
    Channels,

    /// Show a channel's messages
    History {
        /// `general`, a group or a chat group
        channel: String,

        /// Only messages containing this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Send a message
    Send {
        /// `general`, a group or a chat group
        channel: String,

        text: String,

        /// Path or URL of an image to attach
        #[arg(long)]
        image: Option<String>,

        /// Id of the message being replied to
        #[arg(short, long)]
        reply_to: Option<String>,

        /// Do not wait for a teammate's answer
        #[arg(long)]
        no_reply: bool,
    },

    /// Forward a message to another channel
    Forward {
        /// Message id
        message: String,

        /// Destination channel
        channel: String,
    },

    /// Create a social chat group with the whole team
    NewGroup { name: String },
}

#[derive(Subcommand)]
enum AccountCommand {
    /// List signed-in accounts
    List,

    /// Sign in with an identity provider token
    LoginToken { credential: String },

    /// Sign in with an email address
    Login { email: String, name: String },

    /// Sign in as a guest administrator
    Guest,

    /// Switch to another signed-in account
    Switch {
        /// Employee name or email
        account: String,
    },

    /// Sign out of the current account
    Logout,

    /// Toggle between admin and viewer mode
    Admin,
}

fn fail(error: &dyn Error) -> ! {
    eprintln!("{}", format!("Error: {error}").red());
    std::process::exit(1);
}

fn render_notices(notices: &[Notice]) {
    for notice in notices {
        render_notice(notice);
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| fail(&e));

    let storage_path = config.store_path();
    if let Some(parent) = storage_path.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            eprintln!("Error: Failed to create data directory: {e}");
            std::process::exit(1);
        });
    }
    log::debug!("using store at {}", storage_path.display());

    let storage = JsonFileStorage::new(storage_path);
    let mut store = storage.load().unwrap_or_else(|e| fail(&e));

    let now = Zoned::now();
    let today = now.date();

    let result = match cli.command {
        None | Some(Commands::Dashboard) => {
            let dashboard = dashboard::dashboard(&store, today, now.hour());
            ui::render_dashboard(&dashboard, &store, today);
            Ok(())
        }
        Some(Commands::Deadlines) => {
            let tasks = tasks::deadlines(&store);
            if tasks.is_empty() {
                println!("No upcoming deadlines");
            } else {
                ui::render_view_header("Deadlines", tasks.len(), "task");
                for task in tasks {
                    ui::render_task_line(task, &store, today, 0);
                }
            }
            Ok(())
        }
        Some(Commands::Search { query }) => {
            let results = search::search(&store, &query);
            if results.is_empty() {
                println!("Nothing matches '{query}'");
            } else {
                if !results.tasks.is_empty() {
                    ui::render_view_header("Tasks", results.tasks.len(), "result");
                    for task in &results.tasks {
                        ui::render_task_line(task, &store, today, 0);
                    }
                }
                if !results.groups.is_empty() {
                    ui::render_section_header("Groups");
                    for group in &results.groups {
                        ui::render_group_line(group, &store);
                    }
                }
            }
            Ok(())
        }
        Some(Commands::Task(command)) => run_task(command, &mut store, &storage, today),
        Some(Commands::Group(command)) => run_group(command, &mut store, &storage),
        Some(Commands::Team(command)) => run_team(command, &mut store, &storage),
        Some(Commands::Chat(command)) => run_chat(command, &mut store, &storage, &config),
        Some(Commands::Account(command)) => run_account(command, &mut store, &storage),
        Some(Commands::Report {
            year,
            employee,
            search,
            export,
            years,
        }) => run_report(&store, today, year, employee, search, export, years),
        Some(Commands::Plan { group }) => run_plan(&mut store, &storage, &config, &group, today),
        Some(Commands::Suggest { task }) => run_suggest(&mut store, &storage, &config, &task),
        Some(Commands::Remind {
            every,
            on,
            off,
            run,
            count,
        }) => run_remind(&mut store, &storage, every, on, off, run, count),
        Some(Commands::Version) => {
            println!("taskflow {APP_VERSION}");
            Ok(())
        }
    };

    if let Err(e) = result {
        fail(&*e);
    }
}

fn run_task(
    command: TaskCommand,
    store: &mut Store,
    storage: &impl Storage,
    today: Date,
) -> CommandResult {
    match command {
        TaskCommand::List {
            group,
            assignee,
            mine,
            status,
            sort,
        } => {
            let group = group
                .map(|g| lookup::resolve_group(store, &g))
                .transpose()?;
            let assignee = match (assignee, mine) {
                (Some(a), _) => Some(lookup::resolve_employee(store, &a)?),
                (None, true) => Some(
                    store
                        .current_user()
                        .map(|e| e.id)
                        .ok_or("Sign in to list your tasks")?,
                ),
                (None, false) => None,
            };
            let filter = TaskFilter {
                group,
                assignee,
                status,
                sort,
            };

            let tasks = tasks::list_tasks(store, &filter);
            let title = group
                .and_then(|id| store.get_group(id))
                .map(|g| g.name.clone())
                .unwrap_or_else(|| "All tasks".to_string());
            if tasks.is_empty() {
                println!("No tasks");
            } else {
                ui::render_view_header(&title, tasks.len(), "task");
                for task in tasks {
                    ui::render_task_tree(task, store, today, 0);
                }
            }
        }
        TaskCommand::Add {
            title,
            description,
            group,
            due,
            priority,
            every,
            assign,
        } => {
            let parameters = AddTaskParameters {
                title,
                description,
                group,
                due_date: due,
                priority,
                frequency: every,
                assignee: assign,
            };
            let outcome = tasks::add_task(store, storage, parameters, today)?;
            println!("✓ Task added: {}", outcome.task.title);
            println!("  #{}", outcome.task.task_number);
            if let Some(group) = store.get_group(outcome.task.group_id) {
                println!("  Group: {}", group.name);
            }
            if let Some(due) = outcome.task.due_date {
                println!("  Due: {}", ui::format_due_date(due, today));
            }
            println!("  Priority: {}", outcome.task.priority.label());
            render_notices(&outcome.notices);
        }
        TaskCommand::Done { task } => {
            let outcome = tasks::toggle_complete(store, storage, &task, today)?;
            if outcome.task.completed {
                println!("✓ Completed: {}", outcome.task.title);
            } else {
                println!("○ Reopened: {}", outcome.task.title);
            }
            if let Some(next) = &outcome.next {
                ui::render_task_line(next, store, today, 0);
            }
            render_notices(&outcome.notices);
        }
        TaskCommand::Assign { task, employee } => {
            let outcome = tasks::assign_task(store, storage, &task, employee.as_deref())?;
            match outcome.task.assignee.and_then(|id| store.employee_name(id)) {
                Some(name) => println!("✓ Assigned #{} to {name}", outcome.task.task_number),
                None => println!("✓ Unassigned #{}", outcome.task.task_number),
            }
            render_notices(&outcome.notices);
        }
        TaskCommand::Delete { task } => {
            let outcome = tasks::delete_task(store, storage, &task)?;
            println!("✓ Deleted: {}", outcome.title);
            if outcome.removed > 1 {
                println!("  {} tasks removed", outcome.removed);
            }
        }
        TaskCommand::Sub { parent, title } => {
            let subtask = tasks::add_subtask(store, storage, &parent, &title)?;
            println!("✓ Subtask added: {}", subtask.title);
            println!("  #{}", subtask.task_number);
        }
        TaskCommand::Recurring { task } => {
            let outcome = tasks::toggle_recurring(store, storage, &task)?;
            let state = if outcome.task.is_recurring { "on" } else { "off" };
            println!("✓ Monthly recurrence {state}: {}", outcome.task.title);
            render_notices(&outcome.notices);
        }
        TaskCommand::Expand { task } => {
            let task = tasks::toggle_expand(store, storage, &task)?;
            ui::render_task_tree(&task, store, today, 0);
        }
        TaskCommand::Reorder { tasks: order } => {
            tasks::reorder_tasks(store, storage, &order)?;
            println!("✓ Reordered {} tasks", order.len());
        }
    }
    Ok(())
}

fn run_group(command: GroupCommand, store: &mut Store, storage: &impl Storage) -> CommandResult {
    match command {
        GroupCommand::List => {
            let groups: Vec<_> = store.get_visible_groups().collect();
            if groups.is_empty() {
                println!("No groups");
            } else {
                ui::render_view_header("Groups", groups.len(), "group");
                for group in groups {
                    ui::render_group_line(group, store);
                }
            }
        }
        GroupCommand::New {
            name,
            description,
            members,
            due_day,
            one_off,
            restricted,
        } => {
            let parameters = SaveGroupParameters {
                existing: None,
                name,
                description,
                members,
                default_due_day: due_day,
                is_recurring: !one_off,
                is_restricted: restricted,
            };
            let group = groups::save_group(store, storage, parameters)?;
            println!("✓ Group created: {}", group.name);
            println!("  Slug: {}", group.slug);
        }
        GroupCommand::Edit {
            group,
            name,
            description,
            members,
            due_day,
            recurring,
            restricted,
        } => {
            let id = lookup::resolve_group(store, &group)?;
            let current = store
                .get_group(id)
                .cloned()
                .ok_or_else(|| lookup::LookupError::GroupNotFound(group.clone()))?;
            let members = if members.is_empty() {
                current
                    .member_ids
                    .iter()
                    .filter_map(|id| store.get_employee(*id))
                    .map(|e| e.email.clone().unwrap_or_else(|| e.name.clone()))
                    .collect()
            } else {
                members
            };

            let parameters = SaveGroupParameters {
                existing: Some(current.slug.clone()),
                name: name.unwrap_or(current.name),
                description: description.or(current.description),
                members,
                default_due_day: due_day.or(current.default_due_day),
                is_recurring: recurring.unwrap_or(current.is_recurring),
                is_restricted: restricted.unwrap_or(current.is_restricted),
            };
            let group = groups::save_group(store, storage, parameters)?;
            println!("✓ Group updated: {}", group.name);
        }
        GroupCommand::Restrict { group } => {
            let group = groups::toggle_restriction(store, storage, &group)?;
            let state = if group.is_restricted {
                "restricted"
            } else {
                "visible to everyone"
            };
            println!("✓ {} is now {state}", group.name);
        }
        GroupCommand::Mute { channel } => {
            let muted = groups::toggle_mute(store, storage, &channel)?;
            let state = if muted { "Muted" } else { "Unmuted" };
            println!("✓ {state} {channel}");
        }
    }
    Ok(())
}

fn run_team(command: TeamCommand, store: &mut Store, storage: &impl Storage) -> CommandResult {
    match command {
        TeamCommand::List => {
            let current = store.current_user().map(|e| e.id);
            ui::render_view_header("Team", store.employees.len(), "member");
            for employee in &store.employees {
                ui::render_employee_line(employee, current == Some(employee.id));
            }
        }
        TeamCommand::Invite { name, email, role } => {
            let (employee, notice) = employees::invite_employee(
                store,
                storage,
                InviteEmployeeParameters { name, role, email },
            )?;
            println!("✓ Invited {} ({})", employee.name, employee.role);
            render_notice(&notice);
        }
        TeamCommand::Remove { employee } => {
            let removed = employees::remove_employee(store, storage, &employee)?;
            println!("✓ Removed {}", removed.name);
        }
    }
    Ok(())
}

fn run_chat(
    command: ChatCommand,
    store: &mut Store,
    storage: &impl Storage,
    config: &Config,
) -> CommandResult {
    match command {
        ChatCommand::Channels => {
            ui::render_section_header("Channels");
            println!("  {}  General Chat", "general".dimmed());
            for group in store.get_visible_groups() {
                println!("  {}  {}", group.slug.dimmed(), group.name);
            }
            for chat_group in &store.chat_groups {
                println!("  {}  {}", "chat".dimmed(), chat_group.name);
            }
            println!();
        }
        ChatCommand::History { channel, search } => {
            let (channel, messages) =
                chat::channel_history(store, storage, &channel, search.as_deref())?;
            ui::render_view_header(&store.channel_name(channel), messages.len(), "message");
            for message in &messages {
                ui::render_message(message, store);
            }
        }
        ChatCommand::Send {
            channel,
            text,
            image,
            reply_to,
            no_reply,
        } => {
            let parameters = SendMessageParameters {
                channel,
                text,
                image,
                reply_to,
                simulate_reply: config.chat.simulate_replies && !no_reply,
            };
            let outcome = chat::send_message(
                store,
                storage,
                &TerminalNotifier,
                parameters,
                jiff::Timestamp::now(),
            )?;
            ui::render_message(&outcome.message, store);
            if let Some(reply) = &outcome.reply {
                ui::render_message(reply, store);
            }
        }
        ChatCommand::Forward { message, channel } => {
            let forwarded =
                chat::forward_message(store, storage, &message, &channel, jiff::Timestamp::now())?;
            println!("✓ Forwarded to {}", store.channel_name(forwarded.channel));
        }
        ChatCommand::NewGroup { name } => {
            let chat_group = chat::create_chat_group(store, storage, &name)?;
            println!(
                "✓ Chat group created: {} ({} members)",
                chat_group.name,
                chat_group.member_ids.len()
            );
        }
    }
    Ok(())
}

fn run_account(command: AccountCommand, store: &mut Store, storage: &impl Storage) -> CommandResult {
    let outcome = match command {
        AccountCommand::List => {
            let accounts: Vec<_> = store
                .session
                .accounts
                .iter()
                .filter_map(|id| store.get_employee(*id))
                .collect();
            if accounts.is_empty() {
                println!("No accounts signed in");
            } else {
                ui::render_view_header("Accounts", accounts.len(), "account");
                for account in accounts {
                    let is_current = store.session.current_account == Some(account.id);
                    ui::render_employee_line(account, is_current);
                }
            }
            let mode = if store.session.is_admin { "admin" } else { "viewer" };
            println!("\n  Mode: {}", mode.bold());
            return Ok(());
        }
        AccountCommand::Admin => {
            let is_admin = session::toggle_admin(store, storage)?;
            let mode = if is_admin { "admin" } else { "viewer" };
            println!("✓ Switched to {mode} mode");
            return Ok(());
        }
        AccountCommand::LoginToken { credential } => {
            session::login_with_credential(store, storage, &credential)?
        }
        AccountCommand::Login { email, name } => {
            session::login_with_email(store, storage, &email, &name)?
        }
        AccountCommand::Guest => session::login_as_guest(store, storage)?,
        AccountCommand::Switch { account } => session::switch_account(store, storage, &account)?,
        AccountCommand::Logout => session::logout(store, storage)?,
    };

    render_notice(&outcome.notice);
    Ok(())
}

fn run_report(
    store: &Store,
    today: Date,
    year: Option<i16>,
    employee: Option<String>,
    search: Option<String>,
    export: Option<Option<PathBuf>>,
    years: bool,
) -> CommandResult {
    let tz = TimeZone::system();
    if years {
        let years = reports::available_years(store, today.year(), &tz);
        let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
        println!("{}", years.join("\n"));
        return Ok(());
    }

    let filter = ReportFilter {
        year: year.unwrap_or(today.year()),
        employee,
        query: search,
    };
    let report = reports::build_report(store, &filter, &tz)?;

    match export {
        Some(path) => {
            let path = reports::export_csv(&report, path.as_deref())?;
            println!(
                "✓ Exported {} rows to {}",
                report.rows.len(),
                path.display()
            );
        }
        None if report.rows.is_empty() => println!("No completed tasks in {}", report.year),
        None => ui::render_report(&report),
    }
    Ok(())
}

fn run_plan(
    store: &mut Store,
    storage: &impl Storage,
    config: &Config,
    group: &str,
    today: Date,
) -> CommandResult {
    let generator = GeminiClient::new(&config.ai)?;
    let added = planner::generate_monthly_plan(store, storage, &generator, group, today)?;
    if added.is_empty() {
        println!("No tasks were generated. Run with RUST_LOG=warn for details.");
    } else {
        ui::render_view_header("Planned", added.len(), "task");
        for task in &added {
            ui::render_task_line(task, store, today, 0);
        }
    }
    Ok(())
}

fn run_suggest(
    store: &mut Store,
    storage: &impl Storage,
    config: &Config,
    task: &str,
) -> CommandResult {
    let generator = GeminiClient::new(&config.ai)?;
    let added = planner::suggest_subtasks(store, storage, &generator, task)?;
    if added.is_empty() {
        println!("No subtasks were added.");
    } else {
        for subtask in &added {
            println!("✓ Subtask added: #{} {}", subtask.task_number, subtask.title);
        }
    }
    Ok(())
}

fn run_remind(
    store: &mut Store,
    storage: &impl Storage,
    every: Option<u32>,
    on: bool,
    off: bool,
    run: bool,
    count: Option<u32>,
) -> CommandResult {
    let enabled = match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let settings = if every.is_some() || enabled.is_some() {
        reminder::update_settings(store, storage, every, enabled)?
    } else {
        store.session.reminder.clone()
    };

    let state = if settings.enabled { "on" } else { "off" };
    println!(
        "  Hydration reminder {state}, every {} minutes",
        settings.interval_minutes
    );

    if run {
        let sent = reminder::run_reminders(&TerminalNotifier, &settings, count, std::thread::sleep);
        log::info!("sent {sent} reminders");
    }
    Ok(())
}
