use crate::command::{Command, UiOptions};

/// Receives decoded commands from a [`Dispatcher`](crate::Dispatcher).
///
/// Every hook defaults to doing nothing, so implementors override only what
/// they care about. [`on_command`](Self::on_command) sees every command
/// before its specific hook runs.
pub trait UiHandler {
    fn on_command(&mut self, _command: &Command) {}

    fn on_control(&mut self, _index: i32, _value: f64) {}

    fn on_program(&mut self, _channel: i32, _bank: i32, _program: i32) {}

    fn on_midi_program(&mut self, _bank: i32, _program: f64) {}

    fn on_configure(&mut self, _key: &str, _value: &str) {}

    fn on_note(&mut self, _on: bool, _channel: i32, _note: i32, _velocity: i32) {}

    fn on_show(&mut self) {}

    fn on_focus(&mut self) {}

    fn on_hide(&mut self) {}

    fn on_quit(&mut self) {}

    /// Also called with the window title carried by `uiOptions`.
    fn on_title(&mut self, _title: &str) {}

    fn on_atom(&mut self, _index: i32, _data: &str) {}

    fn on_urid(&mut self, _urid: i32, _uri: &str) {}

    fn on_ui_options(&mut self, _options: &UiOptions) {}

    fn on_parameter(&mut self, _uri: &str, _value: f64) {}

    /// A URI-addressed parameter edited on the other side (`pcontrol`).
    fn on_parameter_edit(&mut self, _uri: &str, _value: f64) {}

    fn on_exiting(&mut self) {}

    fn on_ready(&mut self) {}
}

impl<H: UiHandler + ?Sized> UiHandler for &mut H {
    fn on_command(&mut self, command: &Command) {
        (**self).on_command(command);
    }

    fn on_control(&mut self, index: i32, value: f64) {
        (**self).on_control(index, value);
    }

    fn on_program(&mut self, channel: i32, bank: i32, program: i32) {
        (**self).on_program(channel, bank, program);
    }

    fn on_midi_program(&mut self, bank: i32, program: f64) {
        (**self).on_midi_program(bank, program);
    }

    fn on_configure(&mut self, key: &str, value: &str) {
        (**self).on_configure(key, value);
    }

    fn on_note(&mut self, on: bool, channel: i32, note: i32, velocity: i32) {
        (**self).on_note(on, channel, note, velocity);
    }

    fn on_show(&mut self) {
        (**self).on_show();
    }

    fn on_focus(&mut self) {
        (**self).on_focus();
    }

    fn on_hide(&mut self) {
        (**self).on_hide();
    }

    fn on_quit(&mut self) {
        (**self).on_quit();
    }

    fn on_title(&mut self, title: &str) {
        (**self).on_title(title);
    }

    fn on_atom(&mut self, index: i32, data: &str) {
        (**self).on_atom(index, data);
    }

    fn on_urid(&mut self, urid: i32, uri: &str) {
        (**self).on_urid(urid, uri);
    }

    fn on_ui_options(&mut self, options: &UiOptions) {
        (**self).on_ui_options(options);
    }

    fn on_parameter(&mut self, uri: &str, value: f64) {
        (**self).on_parameter(uri, value);
    }

    fn on_parameter_edit(&mut self, uri: &str, value: f64) {
        (**self).on_parameter_edit(uri, value);
    }

    fn on_exiting(&mut self) {
        (**self).on_exiting();
    }

    fn on_ready(&mut self) {
        (**self).on_ready();
    }
}

/// Route `command` to `handler`'s hooks.
pub fn deliver<H: UiHandler + ?Sized>(handler: &mut H, command: &Command) {
    handler.on_command(command);
    match command {
        Command::Control { index, value } => handler.on_control(*index, *value),
        Command::Program {
            channel,
            bank,
            program,
        } => handler.on_program(*channel, *bank, *program),
        Command::MidiProgram { bank, program } => handler.on_midi_program(*bank, *program),
        Command::Configure { key, value } => handler.on_configure(key, value),
        Command::Note {
            on,
            channel,
            note,
            velocity,
        } => handler.on_note(*on, *channel, *note, *velocity),
        Command::Show => handler.on_show(),
        Command::Focus => handler.on_focus(),
        Command::Hide => handler.on_hide(),
        Command::Quit => handler.on_quit(),
        Command::UiTitle { title } => handler.on_title(title),
        Command::Atom { index, data, .. } => handler.on_atom(*index, data),
        Command::Urid { urid, uri, .. } => handler.on_urid(*urid, uri),
        Command::UiOptions(options) => {
            handler.on_ui_options(options);
            handler.on_title(&options.window_title);
        }
        Command::Parameter { uri, value } => handler.on_parameter(uri, *value),
        Command::PControl { uri, value } => handler.on_parameter_edit(uri, *value),
        Command::Exiting => handler.on_exiting(),
        Command::Ready => handler.on_ready(),
    }
}

/// Collects every delivered command.
impl UiHandler for Vec<Command> {
    fn on_command(&mut self, command: &Command) {
        self.push(command.clone());
    }
}
