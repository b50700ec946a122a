/// Declares the opcode enum together with its script name and operand arity.
/// Discriminants are the opcode ids written into the code stream.
macro_rules! opcodes {
    ($($variant:ident = $name:literal, $arity:literal;)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }

            pub fn arity(self) -> usize {
                match self {
                    $(Opcode::$variant => $arity,)*
                }
            }
        }
    };
}

opcodes! {
    End = "End", 0;
    Equal = "Equal", 2;
    Add = "Add", 2;
    Sub = "Sub", 2;
    Inc = "Inc", 1;
    Dec = "Dec", 1;
    Mul = "Mul", 2;
    Div = "Div", 2;
    ShR = "ShR", 2;
    ShL = "ShL", 2;
    And = "And", 2;
    Or = "Or", 2;
    Xor = "Xor", 2;
    Mod = "Mod", 2;
    FlipSign = "FlipSign", 1;
    CheckEqual = "CheckEqual", 2;
    CheckGreater = "CheckGreater", 2;
    CheckLower = "CheckLower", 2;
    CheckNotEqual = "CheckNotEqual", 2;
    IfEqual = "IfEqual", 3;
    IfGreater = "IfGreater", 3;
    IfGreaterOrEqual = "IfGreaterOrEqual", 3;
    IfLower = "IfLower", 3;
    IfLowerOrEqual = "IfLowerOrEqual", 3;
    IfNotEqual = "IfNotEqual", 3;
    Else = "else", 0;
    EndIf = "endif", 0;
    WEqual = "WEqual", 3;
    WGreater = "WGreater", 3;
    WGreaterOrEqual = "WGreaterOrEqual", 3;
    WLower = "WLower", 3;
    WLowerOrEqual = "WLowerOrEqual", 3;
    WNotEqual = "WNotEqual", 3;
    Loop = "loop", 0;
    Switch = "switch", 2;
    Break = "break", 0;
    EndSwitch = "endswitch", 0;
    Rand = "Rand", 2;
    Sin = "Sin", 2;
    Cos = "Cos", 2;
    Sin256 = "Sin256", 2;
    Cos256 = "Cos256", 2;
    SinChange = "SinChange", 5;
    CosChange = "CosChange", 5;
    ATan2 = "ATan2", 3;
    Interpolate = "Interpolate", 4;
    InterpolateXY = "InterpolateXY", 7;
    LoadSpriteSheet = "LoadSpriteSheet", 1;
    RemoveSpriteSheet = "RemoveSpriteSheet", 1;
    DrawSprite = "DrawSprite", 1;
    DrawSpriteXY = "DrawSpriteXY", 3;
    DrawSpriteScreenXY = "DrawSpriteScreenXY", 3;
    DrawTintRect = "DrawTintRect", 4;
    DrawNumbers = "DrawNumbers", 7;
    DrawActName = "DrawActName", 7;
    DrawLifeIcon = "DrawLifeIcon", 3;
    SpriteFrame = "SpriteFrame", 6;
    EditFrame = "EditFrame", 7;
    LoadPalette = "LoadPalette", 5;
    RotatePalette = "RotatePalette", 3;
    SetScreenFade = "SetScreenFade", 4;
    SetActivePalette = "SetActivePalette", 3;
    SetPaletteFade = "SetPaletteFade", 7;
    CopyPalette = "CopyPalette", 2;
    ClearScreen = "ClearScreen", 1;
    DrawSpriteFX = "DrawSpriteFX", 4;
    DrawSpriteScreenFX = "DrawSpriteScreenFX", 4;
    LoadAnimation = "LoadAnimation", 1;
    SetupMenu = "SetupMenu", 4;
    AddMenuEntry = "AddMenuEntry", 3;
    EditMenuEntry = "EditMenuEntry", 4;
    LoadStage = "LoadStage", 0;
    DrawRect = "DrawRect", 8;
    ResetObjectEntity = "ResetObjectEntity", 5;
    PlayerObjectCollision = "PlayerObjectCollision", 5;
    CreateTempObject = "CreateTempObject", 4;
    BindPlayerToObject = "BindPlayerToObject", 2;
    PlayerTileCollision = "PlayerTileCollision", 0;
    ProcessPlayerControl = "ProcessPlayerControl", 0;
    ProcessAnimation = "ProcessAnimation", 0;
    DrawObjectAnimation = "DrawObjectAnimation", 0;
    DrawPlayerAnimation = "DrawPlayerAnimation", 0;
    SetMusicTrack = "SetMusicTrack", 3;
    PlayMusic = "PlayMusic", 1;
    StopMusic = "StopMusic", 0;
    PlaySfx = "PlaySfx", 2;
    StopSfx = "StopSfx", 1;
    SetSfxAttributes = "SetSfxAttributes", 3;
    ObjectTileCollision = "ObjectTileCollision", 4;
    ObjectTileGrip = "ObjectTileGrip", 4;
    LoadVideo = "LoadVideo", 1;
    NextVideoFrame = "NextVideoFrame", 0;
    PlayStageSfx = "PlayStageSfx", 2;
    StopStageSfx = "StopStageSfx", 1;
    Not = "Not", 1;
    Draw3DScene = "Draw3DScene", 0;
    SetIdentityMatrix = "SetIdentityMatrix", 1;
    MatrixMultiply = "MatrixMultiply", 2;
    MatrixTranslateXYZ = "MatrixTranslateXYZ", 4;
    MatrixScaleXYZ = "MatrixScaleXYZ", 4;
    MatrixRotateX = "MatrixRotateX", 2;
    MatrixRotateY = "MatrixRotateY", 2;
    MatrixRotateZ = "MatrixRotateZ", 2;
    MatrixRotateXYZ = "MatrixRotateXYZ", 4;
    TransformVertices = "TransformVertices", 3;
    CallFunction = "CallFunction", 1;
    EndFunction = "EndFunction", 0;
    SetLayerDeformation = "SetLayerDeformation", 6;
    CheckTouchRect = "CheckTouchRect", 4;
    GetTileLayerEntry = "GetTileLayerEntry", 4;
    SetTileLayerEntry = "SetTileLayerEntry", 4;
    GetBit = "GetBit", 3;
    SetBit = "SetBit", 3;
    PauseMusic = "PauseMusic", 0;
    ResumeMusic = "ResumeMusic", 0;
    ClearDrawList = "ClearDrawList", 1;
    AddDrawListEntityRef = "AddDrawListEntityRef", 2;
    GetDrawListEntityRef = "GetDrawListEntityRef", 3;
    SetDrawListEntityRef = "SetDrawListEntityRef", 3;
    Get16x16TileInfo = "Get16x16TileInfo", 4;
    Copy16x16Tile = "Copy16x16Tile", 2;
    Set16x16TileInfo = "Set16x16TileInfo", 4;
    GetAnimationByName = "GetAnimationByName", 2;
    ReadSaveRAM = "ReadSaveRAM", 0;
    WriteSaveRAM = "WriteSaveRAM", 0;
    LoadFontFile = "LoadFontFile", 1;
    LoadTextFile = "LoadTextFile", 3;
    DrawText = "DrawText", 7;
    GetTextInfo = "GetTextInfo", 5;
    GetVersionNumber = "GetVersionNumber", 2;
    SetAchievement = "SetAchievement", 2;
    SetLeaderboard = "SetLeaderboard", 2;
    LoadOnlineMenu = "LoadOnlineMenu", 1;
    EngineCallback = "EngineCallback", 1;
    HapticEffect = "HapticEffect", 4;
}

impl Opcode {
    pub fn from_id(id: i32) -> Option<Opcode> {
        usize::try_from(id).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// Resolves a script-level call name. `End` is never callable by name:
    /// it is only emitted by `endsub`.
    pub fn lookup(name: &str) -> Option<Opcode> {
        Self::ALL
            .iter()
            .skip(1)
            .find(|op| op.name().eq_ignore_ascii_case(name))
            .copied()
    }
}
