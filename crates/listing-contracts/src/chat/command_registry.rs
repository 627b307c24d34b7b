#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const MULTI_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "select",
        action: "select_files",
    },
    CommandSpec {
        command: "drop",
        action: "drop_files",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "show",
        action: "show",
    },
    CommandSpec {
        command: "tags",
        action: "copy_all_tags",
    },
    CommandSpec {
        command: "reset",
        action: "reset",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const COPY_FIELD_COMMAND: CommandSpec = CommandSpec {
    command: "copy",
    action: "copy_field",
};

pub(crate) const COPY_TAG_COMMAND: CommandSpec = CommandSpec {
    command: "tag",
    action: "copy_tag",
};

/// Field names accepted by `/copy`, in display order.
pub const COPYABLE_FIELDS: &[&str] = &[
    "description",
    "title",
    "primary_color",
    "secondary_color",
    "primary_fabric",
    "occasion",
    "holiday",
    "category",
    "style",
    "price",
    "materials",
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/select",
    "/drop",
    "/generate",
    "/show",
    "/copy",
    "/tag",
    "/tags",
    "/reset",
    "/help",
    "/quit",
];
