//! Device context: settings, key inputs, state machine and their side effects
//!
//! `Keyer` owns everything that changes at runtime. The control loop calls
//! [`Keyer::tick`] once per millisecond and hands every inbound SysEx frame to
//! [`Keyer::handle_sysex`]; both run to completion.

use crate::codec;
use crate::debounce::PaddleInput;
use crate::fsm::{KeyEvent, KeyerFSM};
use crate::hal::{
    Clock, GpioBank, KeyerHal, MidiOut, PinRole, RgbPixel, SettingsStore, SystemControl,
};
use crate::settings::{Settings, SETTINGS_RECORD_LEN, SETTINGS_VERSION};
use crate::sysex::{self, Command, FrameError};
use crate::types::{KeyMode, LedMode, MidiAddress, OutputPhase, PaddleSide, Rgb, Timings};

/// Keyer device bound to a HAL
pub struct Keyer<H: KeyerHal> {
    hal: H,
    settings: Settings,
    timings: Timings,
    address: MidiAddress,
    paddle: PaddleInput,
    fsm: KeyerFSM,
}

impl<H: KeyerHal> Keyer<H> {
    /// Create a keyer running the compiled-in defaults
    ///
    /// No hardware is touched until [`Keyer::boot`].
    pub fn new(hal: H) -> Self {
        let settings = Settings::default();
        let timings = Timings::from_wpm(settings.wpm);
        Self {
            hal,
            settings,
            timings,
            address: MidiAddress::new(settings.channel, settings.note),
            paddle: PaddleInput::new(),
            fsm: KeyerFSM::new(timings),
        }
    }

    /// Load persisted settings and claim the configured pins
    pub fn boot(&mut self) {
        self.settings = load_settings(self.hal.store());

        #[cfg(feature = "defmt")]
        defmt::info!("🔧 Keyer boot: {:?}", self.settings);

        self.setup_hardware();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn address(&self) -> MidiAddress {
        self.address
    }

    pub fn phase(&self) -> OutputPhase {
        self.fsm.current_phase()
    }

    /// True while the output is keyed
    pub fn is_keyed(&self) -> bool {
        self.fsm.is_keyed()
    }

    pub fn paddle(&self) -> &PaddleInput {
        &self.paddle
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn into_hal(self) -> H {
        self.hal
    }

    /// Sample inputs and advance the state machine by at most one transition
    pub fn tick(&mut self) -> Option<KeyEvent> {
        let now = self.hal.clock().now_ms();
        let gpio = self.settings.gpio;

        let event = match self.settings.key_mode {
            KeyMode::None => None,
            KeyMode::StraightKey => {
                let pressed = self.read_key(gpio.straight_key);
                let down = self.paddle.update_straight(pressed, now);
                self.fsm.update_straight(down)
            }
            KeyMode::Paddles => {
                let dit = self.read_key(gpio.dit_paddle);
                let dah = self.read_key(gpio.dah_paddle);
                self.paddle.update(PaddleSide::Dit, dit, now);
                self.paddle.update(PaddleSide::Dah, dah, now);
                self.fsm.update(&self.paddle, now)
            }
        };

        if let Some(event) = event {
            self.apply_key_event(event);
        }
        event
    }

    /// Validate and act on one inbound SysEx frame
    ///
    /// Rejected frames cause no reply and no state change.
    pub fn handle_sysex(&mut self, frame: &[u8]) -> Result<Command, FrameError> {
        let request = sysex::parse(frame)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "📨 SysEx {:?} ({} payload bytes)",
            request.command,
            request.payload.len()
        );

        match request.command {
            Command::GetVersion => {
                let payload = codec::encode_version(SETTINGS_VERSION)?;
                self.reply(Command::GetVersion, &payload)?;
            }
            Command::GetConfig => {
                let payload = codec::encode_config(&self.settings)?;
                self.reply(Command::GetConfig, &payload)?;
            }
            Command::SetConfig => {
                let settings = decode_payload(request.payload)?;
                self.apply_settings(settings);
            }
            Command::SaveConfig => {
                // An empty payload saves the live settings as they are
                if !request.payload.is_empty() {
                    let settings = decode_payload(request.payload)?;
                    self.apply_settings(settings);
                }
                self.save_settings();
            }
            Command::Reboot => {
                self.cut_output();
                self.hal.system().reboot();
            }
            Command::Bootsel => {
                self.cut_output();
                self.hal.system().enter_bootloader();
            }
        }
        Ok(request.command)
    }

    /// Replace the live settings and reconfigure hardware
    pub fn apply_settings(&mut self, settings: Settings) {
        #[cfg(feature = "defmt")]
        defmt::info!("⚙️ Applying settings: {:?}", settings);

        self.release_hardware();
        self.settings = settings;
        self.setup_hardware();
    }

    /// Persist the live settings; failure is logged and otherwise ignored
    pub fn save_settings(&mut self) {
        let record = self.settings.to_record();
        match self.hal.store().persist(&record) {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("💾 Settings saved");
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Settings save failed: {:?}", _e);
            }
        }
    }

    fn reply(&mut self, command: Command, payload: &[u8]) -> Result<(), FrameError> {
        let frame = sysex::build_frame(command, payload)?;
        if let Err(_e) = self.hal.midi().send_sysex(&frame, self.address.cable) {
            #[cfg(feature = "defmt")]
            defmt::warn!("SysEx reply dropped: {:?}", _e);
        }
        Ok(())
    }

    /// Raw read mapped through the active level; read failures mean released
    fn read_key(&mut self, pin: u8) -> bool {
        match self.hal.gpio().read(pin) {
            Ok(level) => level == self.settings.input_mode.active_high(),
            Err(_) => false,
        }
    }

    fn apply_key_event(&mut self, event: KeyEvent) {
        let keyed = matches!(event, KeyEvent::KeyDown(_));
        let address = self.address;
        let velocity = self.settings.volume;

        #[cfg(feature = "defmt")]
        defmt::trace!("🔑 {:?}", event);

        let sent = if keyed {
            self.hal.midi().note_on(address, velocity)
        } else {
            self.hal.midi().note_off(address, velocity)
        };
        if let Err(_e) = sent {
            #[cfg(feature = "defmt")]
            defmt::warn!("MIDI note dropped: {:?}", _e);
        }

        self.set_led(keyed);
        self.set_output(keyed);
    }

    fn set_led(&mut self, on: bool) {
        let result = match self.settings.led_mode {
            LedMode::Disabled => Ok(()),
            LedMode::Normal => self.hal.gpio().write(self.settings.gpio.normal_led, on),
            LedMode::Rgb => self.hal.pixel().show(if on { Rgb::KEYED } else { Rgb::OFF }),
        };
        if let Err(_e) = result {
            #[cfg(feature = "defmt")]
            defmt::warn!("LED update failed: {:?}", _e);
        }
    }

    fn set_output(&mut self, keyed: bool) {
        if let Some(level) = self.settings.output_mode.level(keyed) {
            if let Err(_e) = self.hal.gpio().write(self.settings.gpio.output, level) {
                #[cfg(feature = "defmt")]
                defmt::warn!("Output write failed: {:?}", _e);
            }
        }
    }

    /// Stop any sounding element
    fn cut_output(&mut self) {
        if let Some(event) = self.fsm.abort() {
            self.apply_key_event(event);
        }
    }

    /// Undo `setup_hardware` for the current settings
    fn release_hardware(&mut self) {
        self.cut_output();

        let settings = self.settings;
        let gpio = settings.gpio;
        match settings.key_mode {
            KeyMode::None => {}
            KeyMode::StraightKey => self.configure(gpio.straight_key, PinRole::RELEASED),
            KeyMode::Paddles => {
                self.configure(gpio.dit_paddle, PinRole::RELEASED);
                self.configure(gpio.dah_paddle, PinRole::RELEASED);
            }
        }
        match settings.led_mode {
            LedMode::Disabled => {}
            LedMode::Normal => self.configure(gpio.normal_led, PinRole::RELEASED),
            LedMode::Rgb => {
                if let Err(_e) = self.hal.pixel().show(Rgb::OFF) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("RGB pixel clear failed: {:?}", _e);
                }
            }
        }
        if settings.output_mode.level(false).is_some() {
            self.configure(gpio.output, PinRole::RELEASED);
        }

        self.paddle.reset();
        self.fsm.reset();
    }

    /// Derive timing and addressing from the settings and claim their pins
    fn setup_hardware(&mut self) {
        let settings = self.settings;
        let gpio = settings.gpio;

        self.timings = Timings::from_wpm(settings.wpm);
        self.fsm.set_timings(self.timings);
        self.address = MidiAddress::new(settings.channel, settings.note);
        self.paddle.reset();

        let input = PinRole::Input(settings.input_mode);
        match settings.key_mode {
            KeyMode::None => {}
            KeyMode::StraightKey => self.configure(gpio.straight_key, input),
            KeyMode::Paddles => {
                self.configure(gpio.dit_paddle, input);
                self.configure(gpio.dah_paddle, input);
            }
        }

        match settings.led_mode {
            LedMode::Disabled => {}
            LedMode::Normal => self.configure(gpio.normal_led, PinRole::Output),
            LedMode::Rgb => {
                if let Err(_e) = self.hal.pixel().attach(gpio.rgb_led) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("RGB pixel attach failed: {:?}", _e);
                }
            }
        }
        self.set_led(false);

        if settings.output_mode.level(false).is_some() {
            self.configure(gpio.output, PinRole::Output);
            self.set_output(false);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("⏱️ dit {} ms, dah {} ms", self.timings.dit, self.timings.dah);
    }

    fn configure(&mut self, pin: u8, role: PinRole) {
        if let Err(_e) = self.hal.gpio().configure(pin, role) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Pin {} configure failed: {:?}", pin, _e);
        }
    }
}

/// Read the persisted settings, falling back to defaults
///
/// A missing, short or foreign-version record is replaced by the defaults,
/// which are written back once.
pub fn load_settings<S: SettingsStore>(store: &mut S) -> Settings {
    let mut buf = [0u8; SETTINGS_RECORD_LEN];
    let loaded = match store.load(&mut buf) {
        Ok(len) => Settings::from_record(&buf[..len]),
        Err(_) => None,
    };

    match loaded {
        Some(settings) => settings,
        None => {
            #[cfg(feature = "defmt")]
            defmt::warn!("No valid settings record, using defaults");

            let settings = Settings::default();
            if let Err(_e) = store.persist(&settings.to_record()) {
                #[cfg(feature = "defmt")]
                defmt::warn!("Default settings write-back failed: {:?}", _e);
            }
            settings
        }
    }
}

fn decode_payload(payload: &[u8]) -> Result<Settings, FrameError> {
    if payload.len() != codec::CONFIG_PACKED_LEN {
        return Err(FrameError::BadPayload);
    }
    codec::decode_config(payload)
        .map_err(|_| FrameError::BadPayload)
}

/// Async control loop: drain inbound SysEx, tick, sleep 1 ms
#[cfg(feature = "embassy-time")]
pub async fn run<H: KeyerHal, const N: usize>(
    keyer: &mut Keyer<H>,
    mut inbound: heapless::spsc::Consumer<'_, sysex::SysExFrame, N>,
) -> ! {
    use embassy_time::{Duration, Timer};

    #[cfg(feature = "defmt")]
    defmt::info!("🚀 Keyer loop started");

    loop {
        while let Some(frame) = inbound.dequeue() {
            if let Err(_e) = keyer.handle_sysex(&frame) {
                #[cfg(feature = "defmt")]
                defmt::debug!("SysEx dropped: {:?}", _e);
            }
        }
        keyer.tick();
        Timer::after(Duration::from_millis(1)).await;
    }
}
