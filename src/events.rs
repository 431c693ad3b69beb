//! Event names the game can stream over the websocket, as plain string
//! constants. Availability varies between game versions; subscribing to a
//! name the client does not know is harmless. Pure data, no logic.

pub const ADDITIONAL_CONTENT_LOADED: &str = "AdditionalContentLoaded";
pub const AGENT_COMMAND: &str = "AgentCommand";
pub const AGENT_CREATED: &str = "AgentCreated";
pub const API_INIT: &str = "ApiInit";
pub const APP_PAUSED: &str = "AppPaused";
pub const APP_RESUMED: &str = "AppResumed";
pub const APP_SUSPENDED: &str = "AppSuspended";
pub const AWARD_ACHIEVEMENT: &str = "AwardAchievement";
pub const BLOCK_BROKEN: &str = "BlockBroken";
pub const BLOCK_PLACED: &str = "BlockPlaced";
pub const BOARD_TEXT_UPDATED: &str = "BoardTextUpdated";
pub const BOSS_KILLED: &str = "BossKilled";
pub const CAMERA_USED: &str = "CameraUsed";
pub const CAULDRON_USED: &str = "CauldronUsed";
pub const CONFIGURATION_CHANGED: &str = "ConfigurationChanged";
pub const CONNECTION_FAILED: &str = "ConnectionFailed";
pub const CRAFTING_SESSION_COMPLETED: &str = "CraftingSessionCompleted";
pub const END_OF_DAY: &str = "EndOfDay";
pub const ENTITY_SPAWNED: &str = "EntitySpawned";
pub const FILE_TRANSMISSION_CANCELLED: &str = "FileTransmissionCancelled";
pub const FILE_TRANSMISSION_COMPLETED: &str = "FileTransmissionCompleted";
pub const FILE_TRANSMISSION_STARTED: &str = "FileTransmissionStarted";
pub const FIRST_TIME_CLIENT_OPEN: &str = "FirstTimeClientOpen";
pub const FOCUS_GAINED: &str = "FocusGained";
pub const FOCUS_LOST: &str = "FocusLost";
pub const GAME_SESSION_COMPLETE: &str = "GameSessionComplete";
pub const GAME_SESSION_START: &str = "GameSessionStart";
pub const HARDWARE_INFO: &str = "HardwareInfo";
pub const HAS_NEW_CONTENT: &str = "HasNewContent";
pub const ITEM_ACQUIRED: &str = "ItemAcquired";
pub const ITEM_CRAFTED: &str = "ItemCrafted";
pub const ITEM_DESTROYED: &str = "ItemDestroyed";
pub const ITEM_DROPPED: &str = "ItemDropped";
pub const ITEM_ENCHANTED: &str = "ItemEnchanted";
pub const ITEM_SMELTED: &str = "ItemSmelted";
pub const ITEM_USED: &str = "ItemUsed";
pub const JOIN_CANCELED: &str = "JoinCanceled";
pub const JUKEBOX_USED: &str = "JukeboxUsed";
pub const LICENSE_CENSUS: &str = "LicenseCensus";
pub const MASCOT_CREATED: &str = "MascotCreated";
pub const MENU_SHOWN: &str = "MenuShown";
pub const MOB_INTERACTED: &str = "MobInteracted";
pub const MOB_KILLED: &str = "MobKilled";
pub const MULTIPLAYER_CONNECTION_STATE_CHANGED: &str = "MultiplayerConnectionStateChanged";
pub const MULTIPLAYER_ROUND_END: &str = "MultiplayerRoundEnd";
pub const MULTIPLAYER_ROUND_START: &str = "MultiplayerRoundStart";
pub const NPC_PROPERTIES_UPDATED: &str = "NpcPropertiesUpdated";
pub const OPTIONS_UPDATED: &str = "OptionsUpdated";
pub const PERFORMANCE_METRICS: &str = "performanceMetrics";
pub const PACK_IMPORT_STAGE: &str = "PackImportStage";
pub const PLAYER_BOUNCED: &str = "PlayerBounced";
pub const PLAYER_DIED: &str = "PlayerDied";
pub const PLAYER_JOIN: &str = "PlayerJoin";
pub const PLAYER_LEAVE: &str = "PlayerLeave";
pub const PLAYER_MESSAGE: &str = "PlayerMessage";
pub const PLAYER_TELEPORTED: &str = "PlayerTeleported";
pub const PLAYER_TRANSFORM: &str = "PlayerTransform";
pub const PLAYER_TRAVELLED: &str = "PlayerTravelled";
pub const PORTAL_BUILT: &str = "PortalBuilt";
pub const PORTAL_USED: &str = "PortalUsed";
pub const PORTFOLIO_EXPORTED: &str = "PortfolioExported";
pub const POTION_BREWED: &str = "PotionBrewed";
pub const PURCHASE_ATTEMPT: &str = "PurchaseAttempt";
pub const PURCHASE_RESOLVED: &str = "PurchaseResolved";
pub const REGIONAL_POPUP: &str = "RegionalPopup";
pub const RESPONDED_TO_ACCEPT_CONTENT: &str = "RespondedToAcceptContent";
pub const SCREEN_CHANGED: &str = "ScreenChanged";
pub const SCREEN_HEARTBEAT: &str = "ScreenHeartbeat";
pub const SIGN_IN_TO_EDU: &str = "SignInToEdu";
pub const SIGN_IN_TO_XBOX_LIVE: &str = "SignInToXboxLive";
pub const SIGN_OUT_OF_XBOX_LIVE: &str = "SignOutOfXboxLive";
pub const SPECIAL_MOB_BUILT: &str = "SpecialMobBuilt";
pub const START_CLIENT: &str = "StartClient";
pub const START_WORLD: &str = "StartWorld";
pub const TEXT_TO_SPEECH_TOGGLED: &str = "TextToSpeechToggled";
pub const UGC_DOWNLOAD_COMPLETED: &str = "UgcDownloadCompleted";
pub const UGC_DOWNLOAD_STARTED: &str = "UgcDownloadStarted";
pub const UPLOAD_SKIN: &str = "UploadSkin";
pub const VEHICLE_EXITED: &str = "VehicleExited";
pub const WORLD_EXPORTED: &str = "WorldExported";
pub const WORLD_FILES_LISTED: &str = "WorldFilesListed";
pub const WORLD_GENERATED: &str = "WorldGenerated";
pub const WORLD_LOADED: &str = "WorldLoaded";
pub const WORLD_UNLOADED: &str = "WorldUnloaded";

/// `properties.PlayerGameMode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerGameMode {
    Survival = 0,
    Creative = 1,
    Adventure = 2,
    Spectator = 3,
    Default = 5,
}
